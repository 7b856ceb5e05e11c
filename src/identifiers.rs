//! Type-safe identifiers.
//!
//! Newtype wrappers so connection IDs never get mixed with other values
//! in log fields.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ConnectionId
// ============================================================================

/// Identifies one adapted connection (one ASGI scope).
///
/// Generated when a [`MockTransport`](crate::transport::MockTransport) is
/// created and attached to every log event it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a new random connection ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_matches_uuid() {
        let id = ConnectionId::generate();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
