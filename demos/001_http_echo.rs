//! HTTP request through an in-memory host.
//!
//! Demonstrates:
//! - Building an app with a handler
//! - Feeding a chunked request body
//! - Observing the response messages in order
//!
//! Usage:
//!   cargo run --example 001_http_echo
//!   cargo run --example 001_http_echo -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use asgi_bridge::{
    AsgiApp, AsgiRequest, Handler, HandlerResult, MemoryChannel, Message, MockTransport, Scope,
};
use async_trait::async_trait;
use common::Args;

// ============================================================================
// Handler
// ============================================================================

struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, request: AsgiRequest, transport: &MockTransport) -> HandlerResult {
        let headers = vec![(b"content-type".to_vec(), b"text/plain".to_vec())];
        transport.start_response(200, headers).await?;
        transport.push_data(format!("{} {}\n", request.method, request.url)).await?;
        transport.push_data(request.body).await?;
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::init_logging(args.debug);

    println!("=== 001: HTTP Echo ===\n");

    let app = AsgiApp::builder().handler(Echo).build()?;
    let (channel, mut peer) = MemoryChannel::pair();

    peer.push(Message::HttpRequest {
        body: b"hello ".to_vec(),
        more_body: true,
    })?;
    peer.push(Message::HttpRequest {
        body: b"world".to_vec(),
        more_body: false,
    })?;

    let scope = Scope::http("POST", "/echo")
        .with_header("host", "localhost:8000")
        .with_query("verbose=1");
    app.serve(scope, channel).await?;

    for message in peer.drain() {
        println!("[host] {}", message.to_json()?);
    }

    Ok(())
}
