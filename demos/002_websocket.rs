//! WebSocket session through an in-memory host.
//!
//! Demonstrates:
//! - Subprotocol negotiation on accept
//! - Text and binary frames
//! - Client-initiated disconnect
//!
//! Usage:
//!   cargo run --example 002_websocket

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use asgi_bridge::{
    AsgiApp, AsgiRequest, Error, Handler, HandlerResult, MemoryChannel, Message, MockTransport,
    Payload, Scope, WebSocketConnection,
};
use async_trait::async_trait;
use common::Args;

// ============================================================================
// Handler
// ============================================================================

struct Upper;

#[async_trait]
impl Handler for Upper {
    async fn handle(&self, _request: AsgiRequest, _transport: &MockTransport) -> HandlerResult {
        Ok(())
    }

    async fn websocket(
        &self,
        _request: AsgiRequest,
        connection: Arc<WebSocketConnection>,
    ) -> HandlerResult {
        connection.accept_with(&["chat.v2", "chat.v1"]).await?;

        loop {
            match connection.receive().await {
                Ok(Payload::Text(text)) => connection.send(text.to_uppercase()).await?,
                Ok(Payload::Bytes(bytes)) => connection.send(bytes.len().to_string()).await?,
                Err(Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::init_logging(args.debug);

    println!("=== 002: WebSocket ===\n");

    let app = AsgiApp::builder().handler(Upper).build()?;
    let (channel, mut peer) = MemoryChannel::pair();

    peer.push(Message::WebSocketConnect)?;
    peer.push(Message::ws_receive("hello"))?;
    peer.push(Message::ws_receive(vec![1u8, 2, 3]))?;
    peer.push(Message::WebSocketDisconnect { code: 1000 })?;

    app.serve(Scope::websocket("/chat", ["chat.v1", "chat.v2"]), channel)
        .await?;

    for message in peer.drain() {
        println!("[host] {}", message.to_json()?);
    }

    Ok(())
}
