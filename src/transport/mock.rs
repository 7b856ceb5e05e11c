//! Mock transport.
//!
//! Presents a connection-like surface to the response-writing and upgrade
//! paths while forwarding everything to the host's message channel.
//!
//! # Response Body
//!
//! ```text
//! push_data(b"a")  → { type: http.response.body, body: b"a", more_body: true }
//! push_data(b"b")  → { type: http.response.body, body: b"b", more_body: true }
//! complete()       → { type: http.response.body, body: b"",  more_body: false }
//! ```
//!
//! `push_data` suspends while the flow-control gate is paused.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{HostPort, Message, RawHeader, Scope};

use super::channel::SharedChannel;
use super::flow::FlowControlGate;
use super::websocket::WebSocketConnection;

// ============================================================================
// MockTransport
// ============================================================================

/// Transport facade for one ASGI connection.
pub struct MockTransport {
    /// Log correlation ID.
    id: ConnectionId,
    /// Connection scope, read-only.
    scope: Arc<Scope>,
    /// Host channel.
    channel: SharedChannel,
    /// Backpressure gate.
    gate: FlowControlGate,
    /// `http.response.start` sent.
    started: AtomicBool,
    /// Final body message sent.
    completed: AtomicBool,
    /// The single WebSocket session bound to this transport.
    websocket: Mutex<Option<Arc<WebSocketConnection>>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("id", &self.id)
            .field("scope", &self.scope.kind)
            .field("writable", &self.gate.is_writable())
            .field("completed", &self.is_complete())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Creates a transport for `scope` over `channel`.
    #[must_use]
    pub fn new(scope: Scope, channel: SharedChannel) -> Self {
        let id = ConnectionId::generate();
        debug!(connection = %id, kind = ?scope.kind, path = %scope.path, "Transport created");

        Self {
            id,
            scope: Arc::new(scope),
            channel,
            gate: FlowControlGate::new(),
            started: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            websocket: Mutex::new(None),
        }
    }

    /// Returns this connection's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the connection scope.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the host channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    /// Remote peer address from the scope.
    #[inline]
    #[must_use]
    pub fn peer_addr(&self) -> Option<&HostPort> {
        self.scope.client.as_ref()
    }

    /// Local address from the scope.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> Option<&HostPort> {
        self.scope.server.as_ref()
    }
}

// ============================================================================
// Flow Control
// ============================================================================

impl MockTransport {
    /// Pauses body writes. Called by the host on downstream backpressure.
    pub fn pause_writing(&self) {
        if self.gate.pause() {
            debug!(connection = %self.id, "Writing paused");
        }
    }

    /// Resumes body writes and releases suspended producers.
    pub fn resume_writing(&self) {
        if self.gate.resume() {
            debug!(connection = %self.id, "Writing resumed");
        }
    }

    /// Returns `true` while body writes may proceed.
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.gate.is_writable()
    }

    /// Returns the flow-control gate.
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &FlowControlGate {
        &self.gate
    }
}

// ============================================================================
// Response Writing
// ============================================================================

impl MockTransport {
    /// Sends `http.response.start`.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the response head was already sent
    /// - [`Error::ResponseCompleted`] if the response is finished
    pub async fn start_response(&self, status: u16, headers: Vec<RawHeader>) -> Result<()> {
        if self.is_complete() {
            return Err(Error::ResponseCompleted);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::protocol("response already started"));
        }

        trace!(connection = %self.id, status, "Response started");
        self.channel
            .send(Message::HttpResponseStart { status, headers })
            .await
    }

    /// Returns `true` once the response head was sent.
    #[inline]
    #[must_use]
    pub fn response_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Sends one non-final body chunk, waiting for the gate if paused.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseCompleted`] if [`complete`](Self::complete) ran
    /// - [`Error::ConnectionClosed`] if the channel is gone
    pub async fn push_data(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        if self.is_complete() {
            return Err(Error::ResponseCompleted);
        }

        self.gate.wait_writable().await;

        // Completion may have happened while suspended on the gate.
        if self.is_complete() {
            return Err(Error::ResponseCompleted);
        }

        let body = data.into();
        trace!(connection = %self.id, len = body.len(), "Body chunk");
        self.channel.send(Message::body_chunk(body)).await
    }

    /// Sends the final, empty body message. Allowed once per response.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseCompleted`] on a second call
    /// - [`Error::ConnectionClosed`] if the channel is gone
    pub async fn complete(&self) -> Result<()> {
        if self.completed.swap(true, Ordering::AcqRel) {
            return Err(Error::ResponseCompleted);
        }

        debug!(connection = %self.id, "Response complete");
        self.channel.send(Message::body_end()).await
    }

    /// Returns `true` once the final body message was sent.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

// ============================================================================
// WebSocket Binding
// ============================================================================

impl MockTransport {
    /// Returns the WebSocket session bound to this transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocketNotCreated`] (a bad request) if no session
    /// was created yet.
    pub fn get_websocket_connection(&self) -> Result<Arc<WebSocketConnection>> {
        self.websocket
            .lock()
            .as_ref()
            .map(Arc::clone)
            .ok_or(Error::WebSocketNotCreated)
    }

    /// Creates and binds the transport's single WebSocket session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocketExists`] if a session is already bound.
    pub fn create_websocket_connection(
        &self,
        channel: SharedChannel,
        subprotocols: Option<Vec<String>>,
    ) -> Result<Arc<WebSocketConnection>> {
        let mut slot = self.websocket.lock();
        if slot.is_some() {
            return Err(Error::WebSocketExists);
        }

        let connection = Arc::new(WebSocketConnection::new(channel, subprotocols));
        *slot = Some(Arc::clone(&connection));

        debug!(connection = %self.id, "WebSocket connection created");
        Ok(connection)
    }
}

// ============================================================================
// Tests
// ============================================================================
