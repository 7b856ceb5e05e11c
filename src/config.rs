//! Adapter configuration.
//!
//! Provides the knobs the adapter reads at runtime: mode and verbosity
//! (which gate diagnostic notices), path unquoting, and a fallback server
//! name for URL assembly.
//!
//! # Example
//!
//! ```ignore
//! use asgi_bridge::{AdapterConfig, Mode};
//!
//! let config = AdapterConfig::new()
//!     .with_mode(Mode::Debug)
//!     .with_verbosity(2);
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Where an ASGI-hosted app reports it is served from.
pub const SERVE_LOCATION: &str = "http://<ASGI>";

/// Host name used when neither a `Host` header nor a server address is known.
pub const DEFAULT_SERVER_NAME: &str = "mockserver.local";

/// Highest accepted verbosity.
const MAX_VERBOSITY: u8 = 3;

// ============================================================================
// Mode
// ============================================================================

/// Application run mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Normal operation.
    #[default]
    Production,
    /// Development mode.
    Debug,
}

// ============================================================================
// AdapterConfig
// ============================================================================

/// Runtime configuration for the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Run mode. Ordering notices are only reported in debug mode.
    pub mode: Mode,

    /// Diagnostic verbosity (0-3). Ordering notices need more than 1.
    pub verbosity: u8,

    /// Requested worker thread count for the async runtime.
    ///
    /// The host owns the runtime when serving over ASGI, so this is only
    /// ever reported as ignored.
    pub runtime_threads: Option<usize>,

    /// Fallback host name for request URLs.
    pub server_name: String,

    /// Percent-decode request paths.
    pub unquote_path: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            verbosity: 0,
            runtime_threads: None,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            unquote_path: true,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl AdapterConfig {
    /// Creates the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] on malformed input
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.verbosity > MAX_VERBOSITY {
            return Err(Error::config(format!(
                "verbosity must be at most {MAX_VERBOSITY}, got {}",
                self.verbosity
            )));
        }
        if self.server_name.is_empty() {
            return Err(Error::config("server_name must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl AdapterConfig {
    /// Sets the run mode.
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the verbosity.
    #[inline]
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Requests a runtime thread count (ignored under ASGI).
    #[inline]
    #[must_use]
    pub fn with_runtime_threads(mut self, threads: usize) -> Self {
        self.runtime_threads = Some(threads);
        self
    }

    /// Sets the fallback server name.
    #[inline]
    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Enables or disables path unquoting.
    #[inline]
    #[must_use]
    pub fn with_unquote_path(mut self, unquote: bool) -> Self {
        self.unquote_path = unquote;
        self
    }
}

// ============================================================================
// Queries
// ============================================================================

impl AdapterConfig {
    /// Returns `true` if ordering notices for lifecycle listeners are wanted.
    ///
    /// Needs debug mode and a verbosity above 1.
    #[inline]
    #[must_use]
    pub const fn wants_ordering_notices(&self) -> bool {
        matches!(self.mode, Mode::Debug) && self.verbosity > 1
    }

    /// Returns `true` if an option the host controls was set.
    #[inline]
    #[must_use]
    pub const fn has_ignored_runtime_option(&self) -> bool {
        self.runtime_threads.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
