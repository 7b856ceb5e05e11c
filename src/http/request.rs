//! Request assembly from a scope.
//!
//! Turns the raw scope into the values the routing layer consumes:
//! decoded headers, decoded and raw paths, query arguments and a full URL.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use url::Url;

use crate::config::{AdapterConfig, SERVE_LOCATION};
use crate::error::{Error, Result};
use crate::protocol::{HostPort, RawHeader, Scope, ScopeType};

// ============================================================================
// Constants
// ============================================================================

/// Rejection text for non-ASCII header names.
pub const NON_ASCII_HEADER_NAME: &str = "Header names can only contain US-ASCII characters";

// ============================================================================
// Headers
// ============================================================================

/// Decoded request headers. Names are lowercased, wire order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Decodes raw scope headers.
    ///
    /// Values are read as UTF-8, falling back to Latin-1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if a header name is not US-ASCII.
    pub fn decode(raw: &[RawHeader]) -> Result<Self> {
        let entries = raw
            .iter()
            .map(|(name, value)| {
                if !name.is_ascii() {
                    return Err(Error::bad_request(NON_ASCII_HEADER_NAME));
                }
                let name = String::from_utf8_lossy(name).to_ascii_lowercase();
                Ok((name, decode_text(value).into_owned()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// First value of `name` (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of `name`, in wire order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of header entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// UTF-8 if valid, otherwise Latin-1.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

// ============================================================================
// AsgiRequest
// ============================================================================

/// A request assembled from an HTTP or WebSocket scope.
#[derive(Debug, Clone)]
pub struct AsgiRequest {
    /// Request method.
    pub method: String,
    /// Percent-encoded path as sent on the wire (includes root path).
    pub raw_path: String,
    /// Decoded path, or the raw path when unquoting is off.
    pub path: String,
    /// Query string without `?`.
    pub query_string: String,
    /// Decoded headers.
    pub headers: Headers,
    /// Full request URL.
    pub url: Url,
    /// Remote peer.
    pub client: Option<HostPort>,
    /// Local server.
    pub server: Option<HostPort>,
    /// Subprotocols offered (WebSocket only).
    pub subprotocols: Vec<String>,
    /// `true` for WebSocket upgrades.
    pub is_websocket: bool,
    /// Request body, filled once read from the channel.
    pub body: Vec<u8>,
}

impl AsgiRequest {
    /// Builds a request from `scope`.
    ///
    /// # Errors
    ///
    /// - [`Error::BadRequest`] for non-ASCII header names or a path that
    ///   does not decode to UTF-8
    /// - [`Error::InvalidArgument`] for a lifespan scope
    /// - [`Error::Url`] (also a bad request) if no valid URL can be
    ///   assembled, e.g. from a malformed `Host` header
    pub fn from_scope(scope: &Scope, config: &AdapterConfig) -> Result<Self> {
        if scope.kind == ScopeType::Lifespan {
            return Err(Error::invalid_argument("lifespan scope carries no request"));
        }

        let headers = Headers::decode(&scope.headers)?;
        let raw_path = raw_path(scope);

        let path = if config.unquote_path {
            unquote(&raw_path)?
        } else {
            raw_path.clone()
        };

        let query_string = decode_text(&scope.query_string).into_owned();
        let url = build_url(scope, &headers, &raw_path, &query_string, config)?;

        Ok(Self {
            method: scope.method.to_ascii_uppercase(),
            raw_path,
            path,
            query_string,
            headers,
            url,
            client: scope.client.clone(),
            server: scope.server.clone(),
            subprotocols: scope.subprotocols.clone(),
            is_websocket: scope.is_websocket(),
            body: Vec::new(),
        })
    }

    /// Where the app reports it is served from under ASGI.
    #[inline]
    #[must_use]
    pub const fn serve_location(&self) -> &'static str {
        SERVE_LOCATION
    }

    /// Path segments, split on the raw path and decoded one by one.
    ///
    /// An encoded `%2F` stays inside its segment instead of splitting it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if a segment is not valid UTF-8 once
    /// decoded.
    pub fn path_segments(&self) -> Result<Vec<String>> {
        self.raw_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(unquote)
            .collect()
    }

    /// Decoded query arguments in order. `+` decodes to a space.
    #[must_use]
    pub fn query_args(&self) -> Vec<(String, String)> {
        self.query_string
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_query_part(key), decode_query_part(value))
            })
            .collect()
    }

    /// Body as UTF-8 text, if valid.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Encoded wire path, preferring the host's raw bytes.
fn raw_path(scope: &Scope) -> String {
    match &scope.raw_path {
        Some(raw) => decode_text(raw).into_owned(),
        None => {
            let encoded = scope
                .path
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect::<Vec<_>>()
                .join("/");
            format!("{}{}", scope.root_path, encoded)
        }
    }
}

/// Percent-decodes `text` to UTF-8.
fn unquote(text: &str) -> Result<String> {
    urlencoding::decode(text)
        .map(Cow::into_owned)
        .map_err(|_| Error::bad_request(format!("path is not valid UTF-8: {text}")))
}

fn decode_query_part(part: &str) -> String {
    let spaced = part.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    decode_text(&bytes).into_owned()
}

fn build_url(
    scope: &Scope,
    headers: &Headers,
    raw_path: &str,
    query: &str,
    config: &AdapterConfig,
) -> Result<Url> {
    let host = match (headers.get("host"), &scope.server) {
        (Some(host), _) => host.to_string(),
        (None, Some((host, port))) => format!("{host}:{port}"),
        (None, None) => config.server_name.clone(),
    };

    let path = if raw_path.starts_with('/') {
        Cow::Borrowed(raw_path)
    } else {
        Cow::Owned(format!("/{raw_path}"))
    };

    let mut url = Url::parse(&format!("{}://{}{}", scope.scheme, host, path))?;
    if !query.is_empty() {
        url.set_query(Some(query));
    }
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
