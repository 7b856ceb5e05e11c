//! ASGI transport layer.
//!
//! This module emulates a low-level connection on top of the host's
//! `receive()` / `send(message)` pair.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Application (Rust)  │                         │  ASGI host      │
//! │                      │      Channel            │  (server)       │
//! │  MockTransport       │◄───────────────────────►│                 │
//! │  → FlowControlGate   │   receive() / send()    │  socket I/O     │
//! │  → WebSocketConn.    │                         │                 │
//! └──────────────────────┘                         └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. Host supplies a scope and a [`Channel`]
//! 2. [`MockTransport::new`] wraps them
//! 3. Response path calls `push_data` / `complete`, host drives
//!    `pause_writing` / `resume_writing`
//! 4. Upgrade path calls `create_websocket_connection` once, then the
//!    application talks through [`WebSocketConnection`]
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Channel trait and in-memory implementation |
//! | `flow` | Flow-control gate |
//! | `mock` | Mock transport |
//! | `websocket` | WebSocket session bridge |

// ============================================================================
// Submodules
// ============================================================================

/// Channel trait and in-memory channel.
pub mod channel;

/// Writable/paused gate.
pub mod flow;

/// Connection facade over the channel.
pub mod mock;

/// WebSocket session over ASGI messages.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, ChannelPeer, MemoryChannel, SharedChannel};
pub use flow::FlowControlGate;
pub use mock::MockTransport;
pub use websocket::WebSocketConnection;
