//! Connection scope.
//!
//! The scope describes one connection (protocol, addresses, headers, path,
//! offered subprotocols). It is handed to the adapter once and never
//! mutated afterwards.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// A raw header as `(name, value)` byte strings.
pub type RawHeader = (Vec<u8>, Vec<u8>);

/// A `(host, port)` pair as sent in `client` / `server`.
pub type HostPort = (String, u16);

// ============================================================================
// ScopeType
// ============================================================================

/// Scope discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// Plain HTTP request.
    Http,
    /// WebSocket upgrade.
    Websocket,
    /// Startup/shutdown protocol.
    Lifespan,
}

// ============================================================================
// AsgiVersion
// ============================================================================

/// The `asgi` sub-mapping of a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsgiVersion {
    /// ASGI interface version.
    #[serde(default = "default_asgi_version")]
    pub version: String,
    /// Version of the protocol spec the host implements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
}

fn default_asgi_version() -> String {
    "3.0".to_string()
}

impl Default for AsgiVersion {
    fn default() -> Self {
        Self {
            version: default_asgi_version(),
            spec_version: None,
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Immutable description of one connection.
///
/// # Format
///
/// ```json
/// {
///   "type": "websocket",
///   "path": "/ws",
///   "headers": [[[104, 111, 115, 116], [108, 111, 99, 97, 108]]],
///   "client": ["127.0.0.1", 51000],
///   "server": ["127.0.0.1", 8000],
///   "subprotocols": ["graphql-ws"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope type.
    #[serde(rename = "type")]
    pub kind: ScopeType,

    /// ASGI version info.
    #[serde(default)]
    pub asgi: AsgiVersion,

    /// HTTP version (`1.0`, `1.1`, `2`).
    #[serde(default = "default_http_version")]
    pub http_version: String,

    /// Request method (HTTP only).
    #[serde(default = "default_method")]
    pub method: String,

    /// URL scheme.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Percent-decoded path as sent by the host.
    #[serde(default)]
    pub path: String,

    /// Path bytes exactly as received on the wire, if the host kept them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<Vec<u8>>,

    /// Query string bytes, without the leading `?`.
    #[serde(default)]
    pub query_string: Vec<u8>,

    /// Mount point of the application.
    #[serde(default)]
    pub root_path: String,

    /// Raw request headers in wire order.
    #[serde(default)]
    pub headers: Vec<RawHeader>,

    /// Remote peer address.
    #[serde(default)]
    pub client: Option<HostPort>,

    /// Local listening address.
    #[serde(default)]
    pub server: Option<HostPort>,

    /// Subprotocols offered by the WebSocket client, in client order.
    #[serde(default)]
    pub subprotocols: Vec<String>,
}

fn default_http_version() -> String {
    "1.1".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

impl Scope {
    /// Creates an empty scope of the given type.
    #[must_use]
    pub fn new(kind: ScopeType) -> Self {
        Self {
            kind,
            asgi: AsgiVersion::default(),
            http_version: default_http_version(),
            method: default_method(),
            scheme: match kind {
                ScopeType::Websocket => "ws".to_string(),
                _ => default_scheme(),
            },
            path: "/".to_string(),
            raw_path: None,
            query_string: Vec::new(),
            root_path: String::new(),
            headers: Vec::new(),
            client: None,
            server: None,
            subprotocols: Vec::new(),
        }
    }

    /// Creates an HTTP scope for `method path`.
    #[must_use]
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        let mut scope = Self::new(ScopeType::Http);
        scope.method = method.into();
        scope.path = path.into();
        scope
    }

    /// Creates a WebSocket scope for `path` offering `subprotocols`.
    #[must_use]
    pub fn websocket<S: Into<String>>(
        path: impl Into<String>,
        subprotocols: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut scope = Self::new(ScopeType::Websocket);
        scope.path = path.into();
        scope.subprotocols = subprotocols.into_iter().map(Into::into).collect();
        scope
    }

    /// Creates a lifespan scope.
    #[inline]
    #[must_use]
    pub fn lifespan() -> Self {
        Self::new(ScopeType::Lifespan)
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers
            .push((name.as_ref().to_vec(), value.as_ref().to_vec()));
        self
    }

    /// Sets the raw path bytes.
    #[must_use]
    pub fn with_raw_path(mut self, raw_path: impl Into<Vec<u8>>) -> Self {
        self.raw_path = Some(raw_path.into());
        self
    }

    /// Sets the query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<Vec<u8>>) -> Self {
        self.query_string = query.into();
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn with_client(mut self, host: impl Into<String>, port: u16) -> Self {
        self.client = Some((host.into(), port));
        self
    }

    /// Sets the server address.
    #[must_use]
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server = Some((host.into(), port));
        self
    }

    /// Decodes a scope from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) on malformed input.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the first value of header `name` (ASCII case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, value)| value.as_slice())
    }

    /// Returns `true` for WebSocket scopes.
    #[inline]
    #[must_use]
    pub fn is_websocket(&self) -> bool {
        self.kind == ScopeType::Websocket
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_lifespan_scope() {
        let scope = Scope::from_json(r#"{"type": "lifespan"}"#).expect("parse");
        assert_eq!(scope.kind, ScopeType::Lifespan);
        assert_eq!(scope.asgi.version, "3.0");
        assert!(scope.headers.is_empty());
    }

    #[test]
    fn test_websocket_scope_from_json() {
        let scope = Scope::from_json(
            r#"{
                "type": "websocket",
                "path": "/ws",
                "client": ["127.0.0.1", 51000],
                "subprotocols": ["graphql-ws", "hello"]
            }"#,
        )
        .expect("parse");
        assert!(scope.is_websocket());
        assert_eq!(scope.client, Some(("127.0.0.1".to_string(), 51000)));
        assert_eq!(scope.subprotocols, vec!["graphql-ws", "hello"]);
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let scope = Scope::http("GET", "/").with_header("Host", "example.com");
        assert_eq!(scope.header("host"), Some(&b"example.com"[..]));
        assert_eq!(scope.header("missing"), None);
    }

    #[test]
    fn test_websocket_scheme_default() {
        let scope = Scope::websocket("/ws", ["a"]);
        assert_eq!(scope.scheme, "ws");
        assert_eq!(scope.subprotocols, vec!["a"]);
    }

    #[test]
    fn test_unknown_scope_type_fails() {
        assert!(Scope::from_json(r#"{"type": "smtp"}"#).is_err());
    }
}
