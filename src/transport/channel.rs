//! Message channel abstraction.
//!
//! The hosting server supplies a duplex channel exposing `receive()` and
//! `send(message)`. The adapter never owns the underlying socket.
//!
//! [`MemoryChannel`] is an in-process implementation backed by tokio
//! unbounded channels. Its [`ChannelPeer`] plays the host side: it pushes
//! inbound messages and observes everything the adapter sends, in order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Message;

// ============================================================================
// Channel
// ============================================================================

/// Asynchronous duplex message channel supplied by the host.
///
/// Both operations may suspend. Messages sent are delivered in call order.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Awaits the next inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the host side is gone.
    async fn receive(&self) -> Result<Message>;

    /// Sends a message to the host. Ownership of the message transfers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the host side is gone.
    async fn send(&self, message: Message) -> Result<()>;
}

/// Shared handle to a channel.
pub type SharedChannel = Arc<dyn Channel>;

// ============================================================================
// MemoryChannel
// ============================================================================

/// In-process channel backed by two unbounded tokio channels.
pub struct MemoryChannel {
    /// Messages from the host.
    inbound: Mutex<mpsc::UnboundedReceiver<Message>>,
    /// Messages to the host.
    outbound: mpsc::UnboundedSender<Message>,
}

impl MemoryChannel {
    /// Creates a connected channel and its host-side peer.
    #[must_use]
    pub fn pair() -> (Arc<Self>, ChannelPeer) {
        let (to_app, inbound) = mpsc::unbounded_channel();
        let (outbound, from_app) = mpsc::unbounded_channel();

        let channel = Arc::new(Self {
            inbound: Mutex::new(inbound),
            outbound,
        });

        let peer = ChannelPeer {
            to_app: Some(to_app),
            from_app,
        };

        (channel, peer)
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn receive(&self) -> Result<Message> {
        let message = self
            .inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or(Error::ConnectionClosed)?;

        trace!(kind = message.kind(), "Message received");
        Ok(message)
    }

    async fn send(&self, message: Message) -> Result<()> {
        trace!(kind = message.kind(), "Message sent");
        self.outbound
            .send(message)
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// ChannelPeer
// ============================================================================

/// Host side of a [`MemoryChannel`].
pub struct ChannelPeer {
    /// Sender for inbound messages; `None` once hung up.
    to_app: Option<mpsc::UnboundedSender<Message>>,
    /// Everything the adapter sent.
    from_app: mpsc::UnboundedReceiver<Message>,
}

impl ChannelPeer {
    /// Queues a message for the adapter's next `receive()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the peer hung up or the
    /// channel was dropped.
    pub fn push(&self, message: Message) -> Result<()> {
        self.to_app
            .as_ref()
            .ok_or(Error::ConnectionClosed)?
            .send(message)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Stops feeding the adapter. Already queued messages are still
    /// delivered, after which `receive()` reports closure.
    pub fn hang_up(&mut self) {
        self.to_app = None;
    }

    /// Awaits the next message sent by the adapter.
    ///
    /// Returns `None` once the channel is dropped and drained.
    pub async fn next(&mut self) -> Option<Message> {
        self.from_app.recv().await
    }

    /// Returns the next already-sent message without waiting.
    pub fn try_next(&mut self) -> Option<Message> {
        self.from_app.try_recv().ok()
    }

    /// Returns every already-sent message, in send order.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = self.from_app.try_recv() {
            messages.push(message);
        }
        messages
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_order_preserved() {
        let (channel, mut peer) = MemoryChannel::pair();

        channel.send(Message::body_chunk(b"a".to_vec())).await.unwrap();
        channel.send(Message::body_chunk(b"b".to_vec())).await.unwrap();
        channel.send(Message::body_end()).await.unwrap();

        assert_eq!(
            peer.drain(),
            vec![
                Message::body_chunk(b"a".to_vec()),
                Message::body_chunk(b"b".to_vec()),
                Message::body_end(),
            ]
        );
    }

    #[tokio::test]
    async fn test_receive_pushed_message() {
        let (channel, peer) = MemoryChannel::pair();
        peer.push(Message::LifespanStartup).unwrap();

        assert_eq!(channel.receive().await.unwrap(), Message::LifespanStartup);
    }

    #[tokio::test]
    async fn test_receive_after_hang_up() {
        let (channel, mut peer) = MemoryChannel::pair();
        peer.push(Message::WebSocketConnect).unwrap();
        peer.hang_up();

        assert_eq!(channel.receive().await.unwrap(), Message::WebSocketConnect);
        assert!(matches!(
            channel.receive().await,
            Err(Error::ConnectionClosed)
        ));
        assert!(peer.push(Message::WebSocketConnect).is_err());
    }

    #[tokio::test]
    async fn test_send_after_peer_dropped() {
        let (channel, peer) = MemoryChannel::pair();
        drop(peer);

        let result = channel.send(Message::body_end()).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_try_next_empty() {
        let (_channel, mut peer) = MemoryChannel::pair();
        assert!(peer.try_next().is_none());
    }
}
