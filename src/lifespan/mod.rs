//! Lifespan protocol support.
//!
//! Startup and shutdown hooks run when the host sends `lifespan.startup`
//! and `lifespan.shutdown`.
//!
//! # Listener Timing
//!
//! | Event | Phase | Timing under ASGI |
//! |-------|-------|-------------------|
//! | `before_server_start` | startup | after the host is already up |
//! | `after_server_start` | startup | as native |
//! | `before_server_stop` | shutdown | as native |
//! | `after_server_stop` | shutdown | before the host finishes stopping |
//!
//! The first and last rows are why ordering notices exist.

// ============================================================================
// Submodules
// ============================================================================

/// Lifespan state machine.
pub mod controller;

/// Hook types and registry.
pub mod hooks;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{
    IGNORED_RUNTIME_NOTICE, Lifespan, LifespanState, Phase, START_ORDERING_NOTICE,
    STOP_ORDERING_NOTICE,
};
pub use hooks::{Hook, HookResult, LifecycleHooks, ServerEvent};
