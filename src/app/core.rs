//! ASGI application entry point.
//!
//! [`AsgiApp`] is what the host calls once per connection with a scope and
//! a message channel. It routes by scope type:
//!
//! | Scope | Behavior |
//! |-------|----------|
//! | `lifespan` | Runs the [`Lifespan`] controller with the app's hooks |
//! | `http` | Builds the request, reads the body, calls [`Handler::handle`] |
//! | `websocket` | Awaits `websocket.connect`, binds a session, calls [`Handler::websocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{AdapterConfig, SERVE_LOCATION};
use crate::error::{BoxError, Error, Result};
use crate::http::{AsgiRequest, BodyReader};
use crate::lifespan::{LifecycleHooks, Lifespan};
use crate::protocol::{DEFAULT_CLOSE_CODE, Message, Scope, ScopeType};
use crate::transport::{MockTransport, SharedChannel, WebSocketConnection};

use super::builder::AsgiAppBuilder;
use super::handler::Handler;

// ============================================================================
// Constants
// ============================================================================

/// Close code for a rejected upgrade request.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Close code after a failing WebSocket handler.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

const PLAIN_TEXT: &[u8] = b"text/plain; charset=utf-8";

// ============================================================================
// Types
// ============================================================================

struct AppInner {
    config: Arc<AdapterConfig>,
    hooks: LifecycleHooks,
    handler: Arc<dyn Handler>,
}

// ============================================================================
// AsgiApp
// ============================================================================

/// An application served over ASGI. Cloning shares the same state.
#[derive(Clone)]
pub struct AsgiApp {
    inner: Arc<AppInner>,
}

impl fmt::Debug for AsgiApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsgiApp")
            .field("config", &self.inner.config)
            .field("hooks", &self.inner.hooks.len())
            .finish_non_exhaustive()
    }
}

impl AsgiApp {
    /// Creates an app builder.
    #[inline]
    #[must_use]
    pub fn builder() -> AsgiAppBuilder {
        AsgiAppBuilder::new()
    }

    pub(crate) fn from_parts(
        config: Arc<AdapterConfig>,
        hooks: LifecycleHooks,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            inner: Arc::new(AppInner {
                config,
                hooks,
                handler,
            }),
        }
    }

    /// Returns the adapter configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    /// Returns the registered lifecycle hooks.
    #[inline]
    #[must_use]
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.inner.hooks
    }

    /// Where the app reports it is served from.
    #[inline]
    #[must_use]
    pub const fn serve_location(&self) -> &'static str {
        SERVE_LOCATION
    }

    /// Creates a lifespan controller over `channel`.
    #[must_use]
    pub fn lifespan(&self, channel: SharedChannel) -> Lifespan {
        Lifespan::new(
            self.inner.hooks.clone(),
            Arc::clone(&self.inner.config),
            channel,
        )
    }
}

// ============================================================================
// Dispatch
// ============================================================================

impl AsgiApp {
    /// Serves one connection.
    ///
    /// # Errors
    ///
    /// - [`Error::BadRequest`] or [`Error::Url`] if the request cannot be
    ///   assembled (a complete 400 response or policy close has already
    ///   been sent)
    /// - [`Error::ConnectionClosed`] if the host goes away
    /// - [`Error::Protocol`] on an unexpected message sequence
    pub async fn serve(&self, scope: Scope, channel: SharedChannel) -> Result<()> {
        if scope.kind == ScopeType::Lifespan {
            return self.lifespan(channel).run().await;
        }

        let transport = MockTransport::new(scope, channel);
        self.serve_transport(&transport).await
    }

    /// Serves a connection through a transport the host keeps a handle to,
    /// for example to drive flow control.
    ///
    /// # Errors
    ///
    /// Same as [`serve`](Self::serve).
    pub async fn serve_transport(&self, transport: &MockTransport) -> Result<()> {
        match transport.scope().kind {
            ScopeType::Http => self.serve_http(transport).await,
            ScopeType::Websocket => self.serve_websocket(transport).await,
            ScopeType::Lifespan => self.lifespan(Arc::clone(transport.channel())).run().await,
        }
    }

    async fn serve_http(&self, transport: &MockTransport) -> Result<()> {
        let mut request = match AsgiRequest::from_scope(transport.scope(), &self.inner.config) {
            Ok(request) => request,
            Err(e) => {
                let status = if e.is_bad_request() { 400 } else { 500 };
                warn!(connection = %transport.id(), status, error = %e, "Rejecting request");
                send_plain(transport, status, e.to_string()).await?;
                return Err(e);
            }
        };

        request.body = BodyReader::new(transport.channel().as_ref())
            .read_to_end()
            .await?;

        debug!(
            connection = %transport.id(),
            method = %request.method,
            path = %request.path,
            "Dispatching request"
        );

        if let Err(e) = self.inner.handler.handle(request, transport).await {
            error!(connection = %transport.id(), error = %e, "Request handler failed");
            if !transport.response_started() {
                return send_plain(transport, 500, "Internal Server Error").await;
            }
        }

        if !transport.is_complete() {
            transport.complete().await?;
        }
        Ok(())
    }

    async fn serve_websocket(&self, transport: &MockTransport) -> Result<()> {
        let channel = Arc::clone(transport.channel());
        match channel.receive().await? {
            Message::WebSocketConnect => {}
            other => {
                return Err(Error::protocol(format!(
                    "expected websocket.connect, got {}",
                    other.kind()
                )));
            }
        }

        let scope = transport.scope();
        let offered = (!scope.subprotocols.is_empty()).then(|| scope.subprotocols.clone());
        let connection = transport.create_websocket_connection(channel, offered)?;

        let request = match AsgiRequest::from_scope(scope, &self.inner.config) {
            Ok(request) => request,
            Err(e) => {
                warn!(connection = %transport.id(), error = %e, "Rejecting upgrade");
                finish(&connection, CLOSE_POLICY_VIOLATION, Some(e.to_string())).await?;
                return Err(e);
            }
        };

        debug!(connection = %transport.id(), path = %request.path, "Dispatching websocket");

        match self
            .inner
            .handler
            .websocket(request, Arc::clone(&connection))
            .await
        {
            Ok(()) => finish(&connection, DEFAULT_CLOSE_CODE, None).await,
            Err(e) if is_disconnect(&e) => {
                debug!(connection = %transport.id(), "WebSocket client went away");
                Ok(())
            }
            Err(e) => {
                error!(connection = %transport.id(), error = %e, "WebSocket handler failed");
                finish(&connection, CLOSE_INTERNAL_ERROR, None).await
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Sends a complete plain-text response unless one is already finished.
async fn send_plain(
    transport: &MockTransport,
    status: u16,
    body: impl Into<Vec<u8>>,
) -> Result<()> {
    if transport.is_complete() {
        return Ok(());
    }
    if !transport.response_started() {
        transport
            .start_response(status, vec![(b"content-type".to_vec(), PLAIN_TEXT.to_vec())])
            .await?;
    }
    transport.push_data(body).await?;
    transport.complete().await
}

/// Closes the session if still open. A vanished host is not an error here.
async fn finish(connection: &WebSocketConnection, code: u16, reason: Option<String>) -> Result<()> {
    match connection.close_with(code, reason).await {
        Err(Error::ConnectionClosed) => Ok(()),
        other => other,
    }
}

fn is_disconnect(err: &BoxError) -> bool {
    err.downcast_ref::<Error>()
        .is_some_and(Error::is_connection_error)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::app::HandlerResult;
    use crate::lifespan::Hook;
    use crate::protocol::Payload;
    use crate::transport::{ChannelPeer, MemoryChannel};

    /// Echoes the HTTP body and WebSocket frames.
    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn handle(&self, request: AsgiRequest, transport: &MockTransport) -> HandlerResult {
            transport.start_response(200, vec![]).await?;
            transport.push_data(request.body).await?;
            Ok(())
        }

        async fn websocket(
            &self,
            _request: AsgiRequest,
            connection: Arc<WebSocketConnection>,
        ) -> HandlerResult {
            connection.accept_with(&["bar", "foo"]).await?;
            let frame = connection.receive().await?;
            connection.send(frame).await?;
            Ok(())
        }
    }

    /// Fails, optionally after starting the response.
    struct Failing {
        after_start: bool,
    }

    #[async_trait]
    impl Handler for Failing {
        async fn handle(&self, _request: AsgiRequest, transport: &MockTransport) -> HandlerResult {
            if self.after_start {
                transport.start_response(200, vec![]).await?;
                transport.push_data(b"partial".to_vec()).await?;
            }
            Err("boom".into())
        }
    }

    fn app(handler: impl Handler + 'static) -> AsgiApp {
        AsgiApp::builder().handler(handler).build().unwrap()
    }

    fn channel() -> (SharedChannel, ChannelPeer) {
        let (channel, peer) = MemoryChannel::pair();
        (channel, peer)
    }

    fn request_body(peer: &ChannelPeer, body: &[u8]) {
        peer.push(Message::HttpRequest {
            body: body.to_vec(),
            more_body: false,
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_http_echo() {
        let (channel, mut peer) = channel();
        request_body(&peer, b"hello");

        app(Echo).serve(Scope::http("POST", "/"), channel).await.unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 3);
        assert!(matches!(&sent[0], Message::HttpResponseStart { status: 200, .. }));
        assert!(matches!(&sent[1], Message::HttpResponseBody { body, more_body: true } if body == b"hello"));
        assert!(matches!(&sent[2], Message::HttpResponseBody { body, more_body: false } if body.is_empty()));
    }

    #[tokio::test]
    async fn test_handler_error_before_start_sends_500() {
        let (channel, mut peer) = channel();
        request_body(&peer, b"");

        app(Failing { after_start: false })
            .serve(Scope::http("GET", "/"), channel)
            .await
            .unwrap();

        let sent = peer.drain();
        assert!(matches!(&sent[0], Message::HttpResponseStart { status: 500, .. }));
        let finals = sent
            .iter()
            .filter(|m| matches!(m, Message::HttpResponseBody { more_body: false, .. }))
            .count();
        assert_eq!(finals, 1);
    }

    #[tokio::test]
    async fn test_handler_error_after_start_completes_once() {
        let (channel, mut peer) = channel();
        request_body(&peer, b"");

        app(Failing { after_start: true })
            .serve(Scope::http("GET", "/"), channel)
            .await
            .unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 3);
        assert!(matches!(&sent[0], Message::HttpResponseStart { status: 200, .. }));
        assert!(matches!(&sent[2], Message::HttpResponseBody { more_body: false, .. }));
    }

    #[tokio::test]
    async fn test_non_ascii_header_answers_400() {
        let (channel, mut peer) = channel();
        let scope = Scope::http("GET", "/").with_header("😂", "😅");

        let err = app(Echo).serve(scope, channel).await.unwrap_err();
        assert!(err.is_bad_request());

        let sent = peer.drain();
        assert!(matches!(&sent[0], Message::HttpResponseStart { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_malformed_host_answers_400_and_completes() {
        let (channel, mut peer) = channel();
        let scope = Scope::http("GET", "/").with_header("host", "bad host");

        let err = app(Echo).serve(scope, channel).await.unwrap_err();
        assert!(err.is_bad_request());

        let sent = peer.drain();
        assert!(matches!(&sent[0], Message::HttpResponseStart { status: 400, .. }));
        let finals = sent
            .iter()
            .filter(|m| matches!(m, Message::HttpResponseBody { more_body: false, .. }))
            .count();
        assert_eq!(finals, 1);
        assert!(matches!(sent.last(), Some(Message::HttpResponseBody { more_body: false, .. })));
    }

    #[tokio::test]
    async fn test_disconnect_during_body() {
        let (channel, peer) = channel();
        peer.push(Message::HttpDisconnect).unwrap();

        let err = app(Echo).serve(Scope::http("POST", "/"), channel).await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_websocket_echo_with_subprotocol() {
        let (channel, mut peer) = channel();
        peer.push(Message::WebSocketConnect).unwrap();
        peer.push(Message::ws_receive("hi")).unwrap();

        let scope = Scope::websocket("/ws", ["foo", "bar"]);
        app(Echo).serve(scope, channel).await.unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 3);
        assert!(matches!(
            &sent[0],
            Message::WebSocketAccept { subprotocol: Some(p) } if p == "foo"
        ));
        assert!(matches!(&sent[1], Message::WebSocketSend(Payload::Text(t)) if t == "hi"));
        assert!(matches!(&sent[2], Message::WebSocketClose { code: 1000, .. }));
    }

    #[tokio::test]
    async fn test_websocket_client_disconnect_is_quiet() {
        let (channel, mut peer) = channel();
        peer.push(Message::WebSocketConnect).unwrap();
        peer.push(Message::WebSocketDisconnect { code: 1001 }).unwrap();

        app(Echo)
            .serve(Scope::websocket::<String>("/ws", []), channel)
            .await
            .unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Message::WebSocketAccept { subprotocol: Some(p) } if p == "bar"));
    }

    #[tokio::test]
    async fn test_websocket_default_handler_rejects() {
        let (channel, mut peer) = channel();
        peer.push(Message::WebSocketConnect).unwrap();

        app(Failing { after_start: false })
            .serve(Scope::websocket::<String>("/ws", []), channel)
            .await
            .unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Message::WebSocketClose { code: 1000, .. }));
    }

    #[tokio::test]
    async fn test_websocket_requires_connect() {
        let (channel, peer) = channel();
        peer.push(Message::ws_receive("early")).unwrap();

        let err = app(Echo)
            .serve(Scope::websocket::<String>("/ws", []), channel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_lifespan_scope_runs_hooks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook = {
            let calls = Arc::clone(&calls);
            Hook::sync(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let app = AsgiApp::builder()
            .handler(Echo)
            .before_server_start(hook.clone())
            .after_server_stop(hook)
            .build()
            .unwrap();

        let (channel, mut peer) = channel();
        peer.push(Message::LifespanStartup).unwrap();
        peer.push(Message::LifespanShutdown).unwrap();

        app.serve(Scope::lifespan(), channel).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            peer.drain(),
            vec![Message::LifespanStartupComplete, Message::LifespanShutdownComplete]
        );
    }

    #[tokio::test]
    async fn test_serve_transport_exposes_flow_control() {
        let (channel, mut peer) = channel();
        request_body(&peer, b"x");

        let app = app(Echo);
        let transport = Arc::new(MockTransport::new(Scope::http("GET", "/"), channel));
        transport.pause_writing();

        let task = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { app.serve_transport(&transport).await })
        };

        while transport.gate().waiting() == 0 {
            tokio::task::yield_now().await;
        }
        let held = peer.drain();
        assert_eq!(held.len(), 1);
        assert!(matches!(&held[0], Message::HttpResponseStart { status: 200, .. }));

        transport.resume_writing();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("handler released")
            .unwrap()
            .unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Message::HttpResponseBody { body, more_body: true } if body == b"x"));
    }

    #[test]
    fn test_serve_location() {
        assert_eq!(app(Echo).serve_location(), "http://<ASGI>");
    }
}
