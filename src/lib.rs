//! ASGI bridge - serve an async application behind an ASGI host.
//!
//! The host owns sockets and the event loop. For every connection it hands
//! the app a [`Scope`] and a duplex message [`Channel`]; this crate turns
//! those into requests, response writes, WebSocket sessions and lifecycle
//! hook runs.
//!
//! # Architecture
//!
//! ```text
//! host ──scope + channel──▶ AsgiApp::serve
//!                              ├─ lifespan  ─▶ Lifespan (hooks, startup/shutdown replies)
//!                              ├─ http      ─▶ MockTransport ─▶ Handler::handle
//!                              └─ websocket ─▶ WebSocketConnection ─▶ Handler::websocket
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use asgi_bridge::{AsgiApp, AsgiRequest, Handler, HandlerResult, MockTransport};
//!
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl Handler for Hello {
//!     async fn handle(&self, _req: AsgiRequest, transport: &MockTransport) -> HandlerResult {
//!         transport.start_response(200, vec![]).await?;
//!         transport.push_data(b"hello".to_vec()).await?;
//!         Ok(())
//!     }
//! }
//!
//! let app = AsgiApp::builder().handler(Hello).build()?;
//! app.serve(scope, channel).await?;
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`app`] | [`AsgiApp`], its builder and the [`Handler`] trait |
//! | [`config`] | [`AdapterConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | Request assembly from a scope |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`lifespan`] | Lifecycle hooks and the lifespan state machine |
//! | [`protocol`] | ASGI message and scope types |
//! | [`transport`] | Channel, flow control, mock transport, WebSocket sessions |

// ============================================================================
// Modules
// ============================================================================

/// Application entry point.
pub mod app;

/// Adapter configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Request assembly for HTTP and WebSocket scopes.
pub mod http;

/// Type-safe identifiers.
pub mod identifiers;

/// Lifespan protocol support.
pub mod lifespan;

/// ASGI message and scope types.
pub mod protocol;

/// Transport layer over the host channel.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// App types
pub use app::{AsgiApp, AsgiAppBuilder, Handler, HandlerResult};

// Config types
pub use config::{AdapterConfig, Mode, SERVE_LOCATION};

// Error types
pub use error::{BoxError, Error, Result};

// Request types
pub use http::{AsgiRequest, Headers};

// Identifier types
pub use identifiers::ConnectionId;

// Lifespan types
pub use lifespan::{Hook, HookResult, LifecycleHooks, Lifespan, LifespanState, ServerEvent};

// Protocol types
pub use protocol::{Message, Payload, Scope, ScopeType};

// Transport types
pub use transport::{
    Channel, ChannelPeer, FlowControlGate, MemoryChannel, MockTransport, SharedChannel,
    WebSocketConnection,
};
