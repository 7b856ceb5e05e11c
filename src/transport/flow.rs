//! Flow-control gate.
//!
//! A binary writable/paused gate. The owning transport flips it in
//! response to downstream backpressure; producers of body data await it
//! before pushing another chunk.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

// ============================================================================
// FlowControlGate
// ============================================================================

/// Writable/paused gate with waiter accounting.
///
/// Starts writable. Only [`pause`](Self::pause) and
/// [`resume`](Self::resume) change its state.
#[derive(Debug)]
pub struct FlowControlGate {
    /// `true` while writable.
    state: watch::Sender<bool>,
    /// Chunks currently held back waiting for the gate.
    waiting: AtomicUsize,
}

impl Default for FlowControlGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowControlGate {
    /// Creates an open (writable) gate.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(true);
        Self {
            state,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Closes the gate. Returns `true` if the state changed.
    pub fn pause(&self) -> bool {
        self.state.send_replace(false)
    }

    /// Opens the gate and wakes every waiter. Returns `true` if the state
    /// changed.
    pub fn resume(&self) -> bool {
        !self.state.send_replace(true)
    }

    /// Returns `true` while the gate is open.
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        *self.state.borrow()
    }

    /// Number of producers currently suspended on the gate.
    #[inline]
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    /// Suspends until the gate is writable. Returns at once if it already is.
    pub async fn wait_writable(&self) {
        if self.is_writable() {
            return;
        }

        let mut rx = self.state.subscribe();
        self.waiting.fetch_add(1, Ordering::AcqRel);
        let _waiting = WaitingGuard(&self.waiting);
        // The sender lives as long as `self`, so this cannot observe closure.
        let _ = rx.wait_for(|writable| *writable).await;
    }
}

/// Decrements the waiter count when a wait finishes or is dropped.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// Tests
// ============================================================================
