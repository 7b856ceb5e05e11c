//! WebSocket connection over ASGI messages.
//!
//! Translates application-level `accept` / `send` / `receive` / `close`
//! into `websocket.*` messages on the host channel.
//!
//! # Subprotocol Negotiation
//!
//! When the application accepts with a list of protocols it is willing to
//! speak, the first protocol from the client's offered list that also
//! appears in the application's list wins. Without an offered list, the
//! application's first entry wins.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{DEFAULT_CLOSE_CODE, Message, Payload};

use super::channel::SharedChannel;

// ============================================================================
// SessionState
// ============================================================================

/// Mutable part of a WebSocket session.
#[derive(Debug, Default)]
struct SessionState {
    accepted: bool,
    closed: bool,
    subprotocol: Option<String>,
}

// ============================================================================
// WebSocketConnection
// ============================================================================

/// One WebSocket session bridged onto a message channel.
pub struct WebSocketConnection {
    /// Host channel.
    channel: SharedChannel,
    /// Subprotocols offered by the client, if the host reported any.
    offered: Option<Vec<String>>,
    /// Session flags.
    state: Mutex<SessionState>,
}

impl fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("offered", &self.offered)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl WebSocketConnection {
    /// Creates a session bound to `channel`.
    ///
    /// `offered` is the client's subprotocol list from the scope, if any.
    #[must_use]
    pub fn new(channel: SharedChannel, offered: Option<Vec<String>>) -> Self {
        Self {
            channel,
            offered,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Accepts the connection without a subprotocol.
    ///
    /// # Errors
    ///
    /// See [`accept_with`](Self::accept_with).
    pub async fn accept(&self) -> Result<()> {
        self.accept_with::<&str>(&[]).await
    }

    /// Accepts the connection, negotiating one of `subprotocols`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the session is already closed or the
    ///   accept could not be delivered (the session stays unaccepted)
    /// - [`Error::Protocol`] if the session was already accepted
    pub async fn accept_with<S: AsRef<str>>(&self, subprotocols: &[S]) -> Result<()> {
        let subprotocol = self.negotiate(subprotocols);

        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::ConnectionClosed);
            }
            if state.accepted {
                return Err(Error::protocol("websocket already accepted"));
            }
            state.accepted = true;
            state.subprotocol.clone_from(&subprotocol);
        }

        let sent = self
            .channel
            .send(Message::WebSocketAccept {
                subprotocol: subprotocol.clone(),
            })
            .await;

        if sent.is_err() {
            let mut state = self.state.lock();
            state.accepted = false;
            state.subprotocol = None;
        } else {
            debug!(subprotocol = ?subprotocol, "WebSocket accepted");
        }
        sent
    }

    /// Picks the subprotocol for an accept call.
    fn negotiate<S: AsRef<str>>(&self, accepted: &[S]) -> Option<String> {
        match self.offered.as_deref() {
            Some(offered) if !offered.is_empty() => offered
                .iter()
                .find(|candidate| accepted.iter().any(|a| a.as_ref() == candidate.as_str()))
                .cloned(),
            _ => accepted.first().map(|first| first.as_ref().to_string()),
        }
    }

    /// Sends a text or binary frame.
    ///
    /// Strings go out in the `text` field, byte buffers in `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session is closed.
    pub async fn send(&self, data: impl Into<Payload>) -> Result<()> {
        self.ensure_open()?;
        self.channel.send(Message::WebSocketSend(data.into())).await
    }

    /// Awaits the next frame from the client.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the session is closed or the client
    ///   disconnects
    /// - [`Error::Protocol`] if the next message is not `websocket.receive`
    pub async fn receive(&self) -> Result<Payload> {
        self.ensure_open()?;

        let message = match self.channel.receive().await {
            Ok(message) => message,
            Err(e) => {
                self.mark_closed();
                return Err(e);
            }
        };

        match message {
            Message::WebSocketReceive(payload) => Ok(payload),
            Message::WebSocketDisconnect { code } => {
                debug!(code, "WebSocket disconnected by client");
                self.mark_closed();
                Err(Error::ConnectionClosed)
            }
            other => Err(Error::protocol(format!(
                "expected websocket.receive, got {}",
                other.kind()
            ))),
        }
    }

    /// Closes the session with the normal close code.
    ///
    /// # Errors
    ///
    /// See [`close_with`](Self::close_with).
    pub async fn close(&self) -> Result<()> {
        self.close_with(DEFAULT_CLOSE_CODE, None).await
    }

    /// Closes the session with an explicit code and reason.
    ///
    /// Closing an already closed session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the channel is gone.
    pub async fn close_with(&self, code: u16, reason: Option<String>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }

        debug!(code, "WebSocket closed by application");
        self.channel
            .send(Message::WebSocketClose { code, reason })
            .await
    }

    /// Returns the negotiated subprotocol, if any.
    #[must_use]
    pub fn subprotocol(&self) -> Option<String> {
        self.state.lock().subprotocol.clone()
    }

    /// Returns the client's offered subprotocols.
    #[inline]
    #[must_use]
    pub fn offered_subprotocols(&self) -> Option<&[String]> {
        self.offered.as_deref()
    }

    /// Returns `true` once `accept` has been sent.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.state.lock().accepted
    }

    /// Returns `true` once the session is closed from either side.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.lock().closed {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn mark_closed(&self) {
        self.state.lock().closed = true;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::transport::channel::{ChannelPeer, MemoryChannel};

    fn connection(offered: Option<Vec<&str>>) -> (WebSocketConnection, ChannelPeer) {
        let (channel, peer) = MemoryChannel::pair();
        let offered = offered.map(|list| list.into_iter().map(String::from).collect());
        (WebSocketConnection::new(channel, offered), peer)
    }

    #[tokio::test]
    async fn test_send_text_and_bytes() {
        let (ws, mut peer) = connection(None);

        ws.send("hello").await.unwrap();
        ws.send(b"hello").await.unwrap();

        let sent = peer.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Message::WebSocketSend(Payload::Text("hello".into())));
        assert_eq!(sent[1], Message::WebSocketSend(Payload::Bytes(b"hello".to_vec())));
    }

    #[tokio::test]
    async fn test_receive_text() {
        let (ws, peer) = connection(None);
        peer.push(Message::ws_receive("hello")).unwrap();

        assert_eq!(ws.receive().await.unwrap(), Payload::Text("hello".into()));
    }

    #[tokio::test]
    async fn test_receive_bytes() {
        let (ws, peer) = connection(None);
        peer.push(Message::ws_receive(b"hello")).unwrap();

        assert_eq!(
            ws.receive().await.unwrap(),
            Payload::Bytes(b"hello".to_vec())
        );
    }

    #[tokio::test]
    async fn test_receive_wrong_type() {
        let (ws, peer) = connection(None);
        peer.push(Message::WebSocketConnect).unwrap();

        let err = ws.receive().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(!ws.is_closed());
    }

    #[tokio::test]
    async fn test_accept_without_subprotocols() {
        let (ws, mut peer) = connection(None);
        ws.accept().await.unwrap();

        assert_eq!(
            peer.drain(),
            vec![Message::WebSocketAccept { subprotocol: None }]
        );
        assert!(ws.is_accepted());
    }

    #[tokio::test]
    async fn test_accept_single_subprotocol() {
        let (ws, mut peer) = connection(Some(vec!["graphql-ws"]));
        ws.accept_with(&["graphql-ws"]).await.unwrap();

        assert_eq!(
            peer.drain(),
            vec![Message::WebSocketAccept {
                subprotocol: Some("graphql-ws".into())
            }]
        );
        assert_eq!(ws.subprotocol().as_deref(), Some("graphql-ws"));
    }

    #[tokio::test]
    async fn test_accept_prefers_offered_order() {
        let (ws, mut peer) = connection(Some(vec!["graphql-ws", "hello", "world"]));
        ws.accept_with(&["world", "hello"]).await.unwrap();

        assert_eq!(
            peer.drain(),
            vec![Message::WebSocketAccept {
                subprotocol: Some("hello".into())
            }]
        );
    }

    #[tokio::test]
    async fn test_accept_without_offered_list_uses_first() {
        let (ws, _peer) = connection(None);
        ws.accept_with(&["chat", "superchat"]).await.unwrap();
        assert_eq!(ws.subprotocol().as_deref(), Some("chat"));
    }

    #[tokio::test]
    async fn test_accept_no_overlap() {
        let (ws, _peer) = connection(Some(vec!["graphql-ws"]));
        ws.accept_with(&["mqtt"]).await.unwrap();
        assert_eq!(ws.subprotocol(), None);
    }

    #[tokio::test]
    async fn test_undelivered_accept_leaves_session_unaccepted() {
        let (ws, peer) = connection(Some(vec!["graphql-ws"]));
        drop(peer);

        let err = ws.accept_with(&["graphql-ws"]).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(!ws.is_accepted());
        assert_eq!(ws.subprotocol(), None);
    }

    #[tokio::test]
    async fn test_accept_twice_fails() {
        let (ws, _peer) = connection(None);
        ws.accept().await.unwrap();
        assert!(matches!(
            ws.accept().await,
            Err(Error::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_closes_session() {
        let (ws, peer) = connection(None);
        peer.push(Message::WebSocketDisconnect { code: 1001 }).unwrap();

        assert!(matches!(ws.receive().await, Err(Error::ConnectionClosed)));
        assert!(ws.is_closed());
        assert!(matches!(ws.send("late").await, Err(Error::ConnectionClosed)));
        assert!(matches!(ws.receive().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_explicit_close() {
        let (ws, mut peer) = connection(None);
        ws.close_with(4000, Some("bye".into())).await.unwrap();
        ws.close().await.unwrap();

        assert_eq!(
            peer.drain(),
            vec![Message::WebSocketClose {
                code: 4000,
                reason: Some("bye".into())
            }]
        );
        assert!(matches!(ws.send("x").await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_channel_closed_marks_session_closed() {
        let (channel, peer) = MemoryChannel::pair();
        let ws = WebSocketConnection::new(Arc::clone(&channel) as SharedChannel, None);
        drop(peer);

        assert!(matches!(ws.receive().await, Err(Error::ConnectionClosed)));
        assert!(ws.is_closed());
    }
}
