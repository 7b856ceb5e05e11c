//! Request handler trait.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::AsgiRequest;
use crate::transport::{MockTransport, WebSocketConnection};

// ============================================================================
// Types
// ============================================================================

/// Outcome of a handler call.
pub type HandlerResult = Result<(), BoxError>;

// ============================================================================
// Handler
// ============================================================================

/// Application code driven by [`AsgiApp`](super::AsgiApp).
///
/// HTTP handlers write their response through the transport
/// (`start_response`, `push_data`). The app completes the response after
/// the handler returns, so handlers only call `complete` to finish early.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles one HTTP request. The body is already read.
    async fn handle(&self, request: AsgiRequest, transport: &MockTransport) -> HandlerResult;

    /// Handles one WebSocket session.
    ///
    /// The default rejects the upgrade by closing without accepting.
    async fn websocket(
        &self,
        request: AsgiRequest,
        connection: Arc<WebSocketConnection>,
    ) -> HandlerResult {
        let _ = request;
        connection.close().await?;
        Ok(())
    }
}
