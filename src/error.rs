//! Error types for the ASGI adapter.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use asgi_bridge::{Result, Error};
//!
//! async fn example(transport: &MockTransport) -> Result<()> {
//!     transport.push_data(b"hello".to_vec()).await?;
//!     transport.complete().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Client | [`Error::BadRequest`], [`Error::WebSocketNotCreated`], [`Error::Url`] |
//! | Connection | [`Error::ConnectionClosed`] |
//! | Contract | [`Error::Protocol`], [`Error::InvalidArgument`], [`Error::ResponseCompleted`], [`Error::WebSocketExists`] |
//! | Lifespan | [`Error::Hook`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::lifespan::Phase;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error returned by lifecycle hooks and request handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Client Errors
    // ========================================================================
    /// The client or caller sent something the adapter must reject.
    ///
    /// Surfaced to the caller as a 400-class failure. Never crashes the adapter.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Description of what was wrong with the request.
        message: String,
    },

    /// A WebSocket connection was requested before one was created.
    ///
    /// Reading the upgraded connection before the upgrade happened is a
    /// caller error, so this counts as a bad request.
    #[error("Bad request: improper websocket connection")]
    WebSocketNotCreated,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The message channel or WebSocket session is closed.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Contract Errors
    // ========================================================================
    /// Unexpected message or out-of-order protocol step.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Invalid argument passed to an adapter operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The response was already completed.
    #[error("Response already completed")]
    ResponseCompleted,

    /// A WebSocket connection is already bound to this transport.
    #[error("WebSocket connection already created for this transport")]
    WebSocketExists,

    // ========================================================================
    // Lifespan Errors
    // ========================================================================
    /// A lifecycle hook failed.
    #[error("Lifespan {phase} hook failed: {message}")]
    Hook {
        /// Phase the hook ran in.
        phase: Phase,
        /// Textual description of the hook failure.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Adapter configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request URL could not be assembled, e.g. from a malformed `Host`
    /// header. Counts as a bad request.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a bad request error.
    #[inline]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a hook failure error.
    #[inline]
    pub fn hook(phase: Phase, message: impl Into<String>) -> Self {
        Self::Hook {
            phase,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error should be answered with a 400 status.
    #[inline]
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::BadRequest { .. } | Self::WebSocketNotCreated | Self::Url(_)
        )
    }

    /// Returns `true` if the underlying channel or session is gone.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Returns `true` if a caller broke the adapter's usage contract.
    #[inline]
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::InvalidArgument { .. }
                | Self::ResponseCompleted
                | Self::WebSocketExists
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::bad_request("Header names can only contain US-ASCII characters");
        assert_eq!(
            err.to_string(),
            "Bad request: Header names can only contain US-ASCII characters"
        );
    }

    #[test]
    fn test_hook_error_display() {
        let err = Error::hook(Phase::Startup, "division by zero");
        assert_eq!(
            err.to_string(),
            "Lifespan startup hook failed: division by zero"
        );
    }

    #[test]
    fn test_is_bad_request() {
        assert!(Error::WebSocketNotCreated.is_bad_request());
        assert!(Error::bad_request("nope").is_bad_request());
        assert!(!Error::ConnectionClosed.is_bad_request());
    }

    #[test]
    fn test_url_error_is_bad_request() {
        let err: Error = url::Url::parse("http://bad host/").unwrap_err().into();
        assert!(matches!(err, Error::Url(_)));
        assert!(err.is_bad_request());
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::protocol("test").is_connection_error());
    }

    #[test]
    fn test_is_contract_violation() {
        assert!(Error::ResponseCompleted.is_contract_violation());
        assert!(Error::WebSocketExists.is_contract_violation());
        assert!(Error::protocol("x").is_contract_violation());
        assert!(!Error::WebSocketNotCreated.is_contract_violation());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
