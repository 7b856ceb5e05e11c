//! Application entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AsgiApp`] | Serves one connection per call, routed by scope type |
//! | [`AsgiAppBuilder`] | Configuration, handler and lifecycle listeners |
//! | [`Handler`] | Application code for HTTP and WebSocket requests |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for the app.
pub mod builder;

/// Dispatch by scope type.
pub mod core;

/// Request handler trait.
pub mod handler;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::AsgiAppBuilder;
pub use core::{AsgiApp, CLOSE_INTERNAL_ERROR, CLOSE_POLICY_VIOLATION};
pub use handler::{Handler, HandlerResult};
