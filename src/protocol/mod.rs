//! ASGI protocol types.
//!
//! This module defines the messages exchanged with the hosting server and
//! the scope describing each connection.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `http.request` | Host → App | Request body chunk |
//! | `http.response.start` / `.body` | App → Host | Response head and body |
//! | `websocket.connect` / `.receive` / `.disconnect` | Host → App | WebSocket events |
//! | `websocket.accept` / `.send` / `.close` | App → Host | WebSocket actions |
//! | `lifespan.startup` / `.shutdown` | Host → App | Lifecycle triggers |
//! | `lifespan.*.complete` / `.failed` | App → Host | Lifecycle outcome |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | [`Message`] sum type and [`Payload`] |
//! | `scope` | [`Scope`] connection description |

// ============================================================================
// Submodules
// ============================================================================

/// ASGI message sum type.
pub mod message;

/// Connection scope.
pub mod scope;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{DEFAULT_CLOSE_CODE, Message, Payload};
pub use scope::{AsgiVersion, HostPort, RawHeader, Scope, ScopeType};
