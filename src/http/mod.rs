//! Request assembly for HTTP and WebSocket scopes.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AsgiRequest`] | Request built from a scope |
//! | [`Headers`] | Decoded request headers |
//! | [`BodyReader`] | Pulls `http.request` chunks off the channel |

// ============================================================================
// Submodules
// ============================================================================

/// Request body reading.
pub mod body;

/// Request assembly from a scope.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use body::BodyReader;
pub use request::{AsgiRequest, Headers, NON_ASCII_HEADER_NAME};
