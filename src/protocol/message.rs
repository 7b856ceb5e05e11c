//! ASGI message types.
//!
//! Every message exchanged over a [`Channel`](crate::transport::Channel) is
//! one variant of [`Message`], discriminated by its `type` field.
//!
//! # Format
//!
//! ```json
//! { "type": "http.response.body", "body": [104, 105], "more_body": true }
//! { "type": "websocket.send", "text": "hello" }
//! { "type": "lifespan.startup.failed", "message": "division by zero" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::scope::RawHeader;

// ============================================================================
// Constants
// ============================================================================

/// Close code sent when no explicit code is given (normal closure).
pub const DEFAULT_CLOSE_CODE: u16 = 1000;

fn default_close_code() -> u16 {
    DEFAULT_CLOSE_CODE
}

// ============================================================================
// Message
// ============================================================================

/// A single ASGI message.
///
/// Each variant carries only the fields legal for its `type`. Decoding
/// validates the discriminator first; unrecognized discriminators decode to
/// [`Message::Unknown`] so newer hosts do not break older adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    // ========================================================================
    // HTTP
    // ========================================================================
    /// Request body chunk from the host.
    #[serde(rename = "http.request")]
    HttpRequest {
        /// Body bytes of this chunk.
        #[serde(default)]
        body: Vec<u8>,
        /// Whether more chunks follow.
        #[serde(default)]
        more_body: bool,
    },

    /// Response status line and headers.
    #[serde(rename = "http.response.start")]
    HttpResponseStart {
        /// HTTP status code.
        status: u16,
        /// Raw response headers.
        #[serde(default)]
        headers: Vec<RawHeader>,
    },

    /// Response body chunk.
    #[serde(rename = "http.response.body")]
    HttpResponseBody {
        /// Body bytes of this chunk.
        #[serde(default)]
        body: Vec<u8>,
        /// Whether more chunks follow.
        #[serde(default)]
        more_body: bool,
    },

    /// The HTTP client went away.
    #[serde(rename = "http.disconnect")]
    HttpDisconnect,

    // ========================================================================
    // WebSocket
    // ========================================================================
    /// Client asks to open a WebSocket.
    #[serde(rename = "websocket.connect")]
    WebSocketConnect,

    /// Server accepts the WebSocket, optionally picking a subprotocol.
    #[serde(rename = "websocket.accept")]
    WebSocketAccept {
        /// Negotiated subprotocol, serialized as `null` when absent.
        subprotocol: Option<String>,
    },

    /// Data frame from the client.
    #[serde(rename = "websocket.receive")]
    WebSocketReceive(Payload),

    /// Data frame to the client.
    #[serde(rename = "websocket.send")]
    WebSocketSend(Payload),

    /// Server closes the WebSocket.
    #[serde(rename = "websocket.close")]
    WebSocketClose {
        /// Close code.
        #[serde(default = "default_close_code")]
        code: u16,
        /// Optional close reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The client closed the WebSocket.
    #[serde(rename = "websocket.disconnect")]
    WebSocketDisconnect {
        /// Close code reported by the host.
        #[serde(default = "default_close_code")]
        code: u16,
    },

    // ========================================================================
    // Lifespan
    // ========================================================================
    /// Host is starting up.
    #[serde(rename = "lifespan.startup")]
    LifespanStartup,

    /// Startup hooks finished.
    #[serde(rename = "lifespan.startup.complete")]
    LifespanStartupComplete,

    /// A startup hook failed.
    #[serde(rename = "lifespan.startup.failed")]
    LifespanStartupFailed {
        /// Textual description of the failure.
        message: String,
    },

    /// Host is shutting down.
    #[serde(rename = "lifespan.shutdown")]
    LifespanShutdown,

    /// Shutdown hooks finished.
    #[serde(rename = "lifespan.shutdown.complete")]
    LifespanShutdownComplete,

    /// A shutdown hook failed.
    #[serde(rename = "lifespan.shutdown.failed")]
    LifespanShutdownFailed {
        /// Textual description of the failure.
        message: String,
    },

    /// Any message type this adapter does not know.
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Message Constructors
// ============================================================================

impl Message {
    /// Creates a non-final response body chunk.
    #[inline]
    #[must_use]
    pub fn body_chunk(body: impl Into<Vec<u8>>) -> Self {
        Self::HttpResponseBody {
            body: body.into(),
            more_body: true,
        }
    }

    /// Creates the final, empty response body message.
    #[inline]
    #[must_use]
    pub fn body_end() -> Self {
        Self::HttpResponseBody {
            body: Vec::new(),
            more_body: false,
        }
    }

    /// Creates a `websocket.send` message.
    #[inline]
    #[must_use]
    pub fn ws_send(payload: impl Into<Payload>) -> Self {
        Self::WebSocketSend(payload.into())
    }

    /// Creates a `websocket.receive` message.
    #[inline]
    #[must_use]
    pub fn ws_receive(payload: impl Into<Payload>) -> Self {
        Self::WebSocketReceive(payload.into())
    }
}

// ============================================================================
// Message Accessors
// ============================================================================

impl Message {
    /// Returns the `type` discriminator of this message.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::HttpRequest { .. } => "http.request",
            Self::HttpResponseStart { .. } => "http.response.start",
            Self::HttpResponseBody { .. } => "http.response.body",
            Self::HttpDisconnect => "http.disconnect",
            Self::WebSocketConnect => "websocket.connect",
            Self::WebSocketAccept { .. } => "websocket.accept",
            Self::WebSocketReceive(_) => "websocket.receive",
            Self::WebSocketSend(_) => "websocket.send",
            Self::WebSocketClose { .. } => "websocket.close",
            Self::WebSocketDisconnect { .. } => "websocket.disconnect",
            Self::LifespanStartup => "lifespan.startup",
            Self::LifespanStartupComplete => "lifespan.startup.complete",
            Self::LifespanStartupFailed { .. } => "lifespan.startup.failed",
            Self::LifespanShutdown => "lifespan.shutdown",
            Self::LifespanShutdownComplete => "lifespan.shutdown.complete",
            Self::LifespanShutdownFailed { .. } => "lifespan.shutdown.failed",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` for the lifespan message family.
    #[inline]
    #[must_use]
    pub fn is_lifespan(&self) -> bool {
        self.kind().starts_with("lifespan.")
    }
}

// ============================================================================
// JSON Codec
// ============================================================================

impl Message {
    /// Decodes a message from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the JSON is malformed,
    /// has no `type`, or violates the field contract of its type.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes this message to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

// ============================================================================
// Payload
// ============================================================================

/// WebSocket frame data: exactly one of `text` or `bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPayload", into = "RawPayload")]
pub enum Payload {
    /// Textual frame, carried in the `text` field.
    Text(String),
    /// Binary frame, carried in the `bytes` field.
    Bytes(Vec<u8>),
}

impl Payload {
    /// Returns the text, if this is a textual frame.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// Returns the bytes, if this is a binary frame.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }

    /// Returns `true` for textual frames.
    #[inline]
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Length of the frame data in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    /// Returns `true` if the frame carries no data.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// Wire shape of [`Payload`]: both fields optional, validated on conversion.
#[derive(Serialize, Deserialize)]
struct RawPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bytes: Option<Vec<u8>>,
}

impl TryFrom<RawPayload> for Payload {
    type Error = String;

    fn try_from(raw: RawPayload) -> std::result::Result<Self, Self::Error> {
        match (raw.text, raw.bytes) {
            (Some(text), None) => Ok(Self::Text(text)),
            (None, Some(bytes)) => Ok(Self::Bytes(bytes)),
            (Some(_), Some(_)) => Err("frame has both `text` and `bytes`".to_string()),
            (None, None) => Err("frame has neither `text` nor `bytes`".to_string()),
        }
    }
}

impl From<Payload> for RawPayload {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Self {
                text: Some(text),
                bytes: None,
            },
            Payload::Bytes(bytes) => Self {
                text: None,
                bytes: Some(bytes),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    fn to_value(message: &Message) -> Value {
        serde_json::to_value(message).expect("serialize")
    }

    #[test]
    fn test_body_chunk_fields() {
        let value = to_value(&Message::body_chunk(b"hi".to_vec()));
        assert_eq!(value["type"], "http.response.body");
        assert_eq!(value["more_body"], true);
        assert_eq!(value["body"], serde_json::json!([104, 105]));
    }

    #[test]
    fn test_body_end_is_empty_and_final() {
        assert_eq!(
            Message::body_end(),
            Message::HttpResponseBody {
                body: Vec::new(),
                more_body: false
            }
        );
    }

    #[test]
    fn test_ws_send_text_has_no_bytes_key() {
        let value = to_value(&Message::ws_send("hello"));
        assert_eq!(value["type"], "websocket.send");
        assert_eq!(value["text"], "hello");
        assert!(value.get("bytes").is_none());
    }

    #[test]
    fn test_ws_send_bytes_has_no_text_key() {
        let value = to_value(&Message::ws_send(b"hello"));
        assert_eq!(value["type"], "websocket.send");
        assert!(value.get("text").is_none());
        assert!(value.get("bytes").is_some());
    }

    #[test]
    fn test_accept_serializes_null_subprotocol() {
        let value = to_value(&Message::WebSocketAccept { subprotocol: None });
        assert_eq!(value["type"], "websocket.accept");
        assert!(value["subprotocol"].is_null());
        assert!(value.as_object().expect("object").contains_key("subprotocol"));
    }

    #[test]
    fn test_decode_receive_text() {
        let message =
            Message::from_json(r#"{"type": "websocket.receive", "text": "hello"}"#).expect("parse");
        assert_eq!(message, Message::ws_receive("hello"));
    }

    #[test]
    fn test_decode_receive_rejects_both_fields() {
        let result =
            Message::from_json(r#"{"type": "websocket.receive", "text": "a", "bytes": [97]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_receive_rejects_empty_frame() {
        assert!(Message::from_json(r#"{"type": "websocket.receive"}"#).is_err());
    }

    #[test]
    fn test_decode_lifespan_failed() {
        let message = Message::from_json(
            r#"{"type": "lifespan.startup.failed", "message": "division by zero"}"#,
        )
        .expect("parse");
        assert_eq!(
            message,
            Message::LifespanStartupFailed {
                message: "division by zero".to_string()
            }
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let message = Message::from_json(r#"{"type": "lifespan.reload"}"#).expect("parse");
        assert_eq!(message, Message::Unknown);
    }

    #[test]
    fn test_decode_missing_type_fails() {
        assert!(Message::from_json(r#"{"body": []}"#).is_err());
    }

    #[test]
    fn test_close_defaults() {
        let message = Message::from_json(r#"{"type": "websocket.disconnect"}"#).expect("parse");
        assert_eq!(message, Message::WebSocketDisconnect { code: 1000 });
    }

    #[test]
    fn test_kind_and_lifespan_family() {
        assert_eq!(Message::LifespanShutdown.kind(), "lifespan.shutdown");
        assert!(Message::LifespanShutdownComplete.is_lifespan());
        assert!(!Message::WebSocketConnect.is_lifespan());
        assert_eq!(Message::body_end().to_string(), "http.response.body");
    }

    #[test]
    fn test_payload_accessors() {
        let text = Payload::from("abc");
        let bytes = Payload::from(vec![1u8, 2]);
        assert_eq!(text.as_text(), Some("abc"));
        assert_eq!(text.as_bytes(), None);
        assert_eq!(bytes.as_bytes(), Some(&[1u8, 2][..]));
        assert!(text.is_text());
        assert_eq!(bytes.len(), 2);
        assert!(!bytes.is_empty());
    }
}
