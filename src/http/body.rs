//! Request body reading.
//!
//! The host delivers the body as a sequence of `http.request` messages,
//! the last one carrying `more_body: false`.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Message;
use crate::transport::Channel;

// ============================================================================
// BodyReader
// ============================================================================

/// Pulls request body chunks from a channel.
pub struct BodyReader<'a> {
    channel: &'a dyn Channel,
    finished: bool,
    received: usize,
}

impl<'a> BodyReader<'a> {
    /// Creates a reader over `channel`.
    #[must_use]
    pub fn new(channel: &'a dyn Channel) -> Self {
        Self {
            channel,
            finished: false,
            received: 0,
        }
    }

    /// Returns the next chunk, or `None` after the last one.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] on `http.disconnect` or a closed channel
    /// - [`Error::Protocol`] on any other message type
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }

        match self.channel.receive().await? {
            Message::HttpRequest { body, more_body } => {
                self.finished = !more_body;
                self.received += body.len();
                trace!(len = body.len(), more_body, "Request body chunk");
                Ok(Some(body))
            }
            Message::HttpDisconnect => {
                self.finished = true;
                Err(Error::ConnectionClosed)
            }
            other => Err(Error::protocol(format!(
                "expected http.request, got {}",
                other.kind()
            ))),
        }
    }

    /// Reads every remaining chunk into one buffer.
    ///
    /// # Errors
    ///
    /// Same as [`next_chunk`](Self::next_chunk).
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    /// Total bytes received so far.
    #[inline]
    #[must_use]
    pub const fn received(&self) -> usize {
        self.received
    }

    /// Returns `true` once the last chunk was read.
    #[inline]
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }
}

// ============================================================================
// Tests
// ============================================================================
