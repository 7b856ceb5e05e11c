//! Lifecycle hooks.
//!
//! Hooks are registered per [`ServerEvent`] and normalized to a uniform
//! async invocation whether their body is synchronous or asynchronous.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use rustc_hash::FxHashMap;

use crate::error::BoxError;

use super::Phase;

// ============================================================================
// Types
// ============================================================================

/// Outcome of one hook invocation.
pub type HookResult = Result<(), BoxError>;

/// Normalized hook body.
type HookFn = dyn Fn() -> BoxFuture<'static, HookResult> + Send + Sync;

// ============================================================================
// ServerEvent
// ============================================================================

/// Server lifecycle events that hooks attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerEvent {
    /// Before the server starts accepting connections.
    BeforeServerStart,
    /// After the server started.
    AfterServerStart,
    /// Before the server stops.
    BeforeServerStop,
    /// After the server stopped.
    AfterServerStop,
}

impl ServerEvent {
    /// All events in firing order.
    pub const ALL: [Self; 4] = [
        Self::BeforeServerStart,
        Self::AfterServerStart,
        Self::BeforeServerStop,
        Self::AfterServerStop,
    ];

    /// Listener name of this event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeServerStart => "before_server_start",
            Self::AfterServerStart => "after_server_start",
            Self::BeforeServerStop => "before_server_stop",
            Self::AfterServerStop => "after_server_stop",
        }
    }

    /// Lifespan phase this event fires in.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::BeforeServerStart | Self::AfterServerStart => Phase::Startup,
            Self::BeforeServerStop | Self::AfterServerStop => Phase::Shutdown,
        }
    }

    /// Events of `phase`, in firing order.
    #[must_use]
    pub const fn of_phase(phase: Phase) -> [Self; 2] {
        match phase {
            Phase::Startup => [Self::BeforeServerStart, Self::AfterServerStart],
            Phase::Shutdown => [Self::BeforeServerStop, Self::AfterServerStop],
        }
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Hook
// ============================================================================

/// A lifecycle hook.
///
/// Cloning is cheap; the body is shared so one set of hooks can drive
/// several lifespan sessions.
#[derive(Clone)]
pub struct Hook {
    /// Optional name for logs.
    name: Option<String>,
    /// Normalized body.
    run: Arc<HookFn>,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Hook {
    /// Wraps a synchronous hook.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> HookResult + Send + Sync + 'static,
    {
        Self {
            name: None,
            run: Arc::new(move || future::ready(f()).boxed()),
        }
    }

    /// Wraps an asynchronous hook.
    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self {
            name: None,
            run: Arc::new(move || f().boxed()),
        }
    }

    /// Sets the name reported in logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the hook's name, if set.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Runs the hook to completion.
    pub async fn invoke(&self) -> HookResult {
        (self.run)().await
    }
}

// ============================================================================
// LifecycleHooks
// ============================================================================

/// Hooks keyed by server event, each list in registration order.
#[derive(Debug, Clone, Default)]
pub struct LifecycleHooks {
    hooks: FxHashMap<ServerEvent, Vec<Hook>>,
}

impl LifecycleHooks {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `hook` to `event`'s list.
    pub fn register(&mut self, event: ServerEvent, hook: Hook) {
        self.hooks.entry(event).or_default().push(hook);
    }

    /// Hooks registered for `event`.
    #[must_use]
    pub fn get(&self, event: ServerEvent) -> &[Hook] {
        self.hooks.get(&event).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if any hook is registered for `event`.
    #[inline]
    #[must_use]
    pub fn has(&self, event: ServerEvent) -> bool {
        !self.get(event).is_empty()
    }

    /// Total number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Returns `true` if no hook is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hooks of `phase` in execution order, paired with their event.
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = (ServerEvent, &Hook)> {
        ServerEvent::of_phase(phase)
            .into_iter()
            .flat_map(move |event| self.get(event).iter().map(move |hook| (event, hook)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sync_hook_invoke() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook = {
            let calls = Arc::clone(&calls);
            Hook::sync(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        hook.invoke().await.unwrap();
        hook.invoke().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_async_hook_error_text() {
        let hook = Hook::async_fn(|| async { Err::<(), BoxError>("division by zero".into()) });
        let err = hook.invoke().await.unwrap_err();
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn test_named_hook() {
        let hook = Hook::sync(|| Ok(())).named("open_pool");
        assert_eq!(hook.name(), Some("open_pool"));
    }

    #[test]
    fn test_event_phase_mapping() {
        assert_eq!(ServerEvent::BeforeServerStart.phase(), Phase::Startup);
        assert_eq!(ServerEvent::AfterServerStop.phase(), Phase::Shutdown);
        assert_eq!(ServerEvent::AfterServerStart.to_string(), "after_server_start");
        assert!(ServerEvent::ALL.iter().all(|e| ServerEvent::of_phase(e.phase()).contains(e)));
    }

    #[test]
    fn test_phase_order() {
        let mut hooks = LifecycleHooks::new();
        hooks.register(ServerEvent::AfterServerStart, Hook::sync(|| Ok(())).named("c"));
        hooks.register(ServerEvent::BeforeServerStart, Hook::sync(|| Ok(())).named("a"));
        hooks.register(ServerEvent::BeforeServerStart, Hook::sync(|| Ok(())).named("b"));
        hooks.register(ServerEvent::BeforeServerStop, Hook::sync(|| Ok(())).named("d"));

        let names: Vec<_> = hooks
            .phase(Phase::Startup)
            .filter_map(|(_, hook)| hook.name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(hooks.len(), 4);
        assert!(hooks.has(ServerEvent::BeforeServerStop));
        assert!(!hooks.has(ServerEvent::AfterServerStop));
    }
}
