//! Lifespan startup and shutdown.
//!
//! Demonstrates:
//! - Registering sync and async listeners
//! - Ordering notices at higher verbosity
//! - Startup failure reporting
//!
//! Usage:
//!   cargo run --example 003_lifespan
//!   cargo run --example 003_lifespan -- --verbose

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use asgi_bridge::{
    AdapterConfig, AsgiApp, AsgiRequest, Handler, HandlerResult, Hook, MemoryChannel, Message,
    MockTransport, Mode, Scope,
};
use async_trait::async_trait;
use common::Args;

// ============================================================================
// Handler
// ============================================================================

struct Noop;

#[async_trait]
impl Handler for Noop {
    async fn handle(&self, _request: AsgiRequest, _transport: &MockTransport) -> HandlerResult {
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::init_logging(true);

    println!("=== 003: Lifespan ===\n");

    let verbosity = if args.verbose { 2 } else { 0 };
    let config = AdapterConfig::new()
        .with_mode(Mode::Debug)
        .with_verbosity(verbosity);

    let app = AsgiApp::builder()
        .config(config)
        .handler(Noop)
        .before_server_start(Hook::sync(|| {
            println!("[hook] before_server_start");
            Ok(())
        }))
        .after_server_start(Hook::async_fn(|| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            println!("[hook] after_server_start");
            Ok(())
        }))
        .after_server_stop(Hook::sync(|| {
            println!("[hook] after_server_stop");
            Ok(())
        }))
        .build()?;

    let (channel, mut peer) = MemoryChannel::pair();
    peer.push(Message::LifespanStartup)?;
    peer.push(Message::LifespanShutdown)?;
    app.serve(Scope::lifespan(), channel).await?;

    for message in peer.drain() {
        println!("[host] {}", message.to_json()?);
    }

    println!("\n--- failing startup ---\n");

    let failing = AsgiApp::builder()
        .handler(Noop)
        .before_server_start(Hook::sync(|| Err("database unreachable".into())))
        .build()?;

    let (channel, mut peer) = MemoryChannel::pair();
    peer.push(Message::LifespanStartup)?;
    peer.push(Message::LifespanShutdown)?;
    failing.serve(Scope::lifespan(), channel).await?;

    for message in peer.drain() {
        println!("[host] {}", message.to_json()?);
    }

    Ok(())
}
