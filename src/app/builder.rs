//! Builder for [`AsgiApp`].
//!
//! # Example
//!
//! ```ignore
//! use asgi_bridge::{AsgiApp, Hook};
//!
//! let app = AsgiApp::builder()
//!     .handler(MyHandler)
//!     .before_server_start(Hook::sync(|| Ok(())))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::lifespan::{Hook, LifecycleHooks, ServerEvent};

use super::core::AsgiApp;
use super::handler::Handler;

// ============================================================================
// AsgiAppBuilder
// ============================================================================

/// Builder for configuring an [`AsgiApp`].
#[derive(Default)]
pub struct AsgiAppBuilder {
    /// Adapter configuration; defaults apply when unset.
    config: Option<AdapterConfig>,
    /// Request handler.
    handler: Option<Arc<dyn Handler>>,
    /// Lifecycle listeners.
    hooks: LifecycleHooks,
}

impl fmt::Debug for AsgiAppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsgiAppBuilder")
            .field("config", &self.config)
            .field("has_handler", &self.handler.is_some())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl AsgiAppBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the adapter configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the request handler.
    #[inline]
    #[must_use]
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets an already shared request handler.
    #[inline]
    #[must_use]
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Registers `hook` for `event`.
    #[must_use]
    pub fn listener(mut self, event: ServerEvent, hook: Hook) -> Self {
        self.hooks.register(event, hook);
        self
    }

    /// Registers a `before_server_start` listener.
    #[inline]
    #[must_use]
    pub fn before_server_start(self, hook: Hook) -> Self {
        self.listener(ServerEvent::BeforeServerStart, hook)
    }

    /// Registers an `after_server_start` listener.
    #[inline]
    #[must_use]
    pub fn after_server_start(self, hook: Hook) -> Self {
        self.listener(ServerEvent::AfterServerStart, hook)
    }

    /// Registers a `before_server_stop` listener.
    #[inline]
    #[must_use]
    pub fn before_server_stop(self, hook: Hook) -> Self {
        self.listener(ServerEvent::BeforeServerStop, hook)
    }

    /// Registers an `after_server_stop` listener.
    #[inline]
    #[must_use]
    pub fn after_server_stop(self, hook: Hook) -> Self {
        self.listener(ServerEvent::AfterServerStop, hook)
    }

    /// Builds the app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no handler was set or the configuration
    /// is invalid.
    pub fn build(self) -> Result<AsgiApp> {
        let handler = self
            .handler
            .ok_or_else(|| Error::config("a request handler is required"))?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        debug!(hooks = self.hooks.len(), mode = ?config.mode, "App built");
        Ok(AsgiApp::from_parts(Arc::new(config), self.hooks, handler))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::app::HandlerResult;
    use crate::http::AsgiRequest;
    use crate::transport::MockTransport;

    struct Noop;

    #[async_trait]
    impl Handler for Noop {
        async fn handle(&self, _request: AsgiRequest, _transport: &MockTransport) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_build_requires_handler() {
        let err = AsgiAppBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_validates_config() {
        let err = AsgiAppBuilder::new()
            .handler(Noop)
            .config(AdapterConfig::new().with_verbosity(7))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_listeners_registered() {
        let app = AsgiAppBuilder::new()
            .handler(Noop)
            .before_server_start(Hook::sync(|| Ok(())))
            .after_server_start(Hook::sync(|| Ok(())))
            .after_server_stop(Hook::sync(|| Ok(())))
            .build()
            .unwrap();

        assert_eq!(app.hooks().len(), 3);
        assert!(app.hooks().has(ServerEvent::AfterServerStop));
        assert!(!app.hooks().has(ServerEvent::BeforeServerStop));
    }
}
