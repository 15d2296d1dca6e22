//! Line framing
//!
//! Reassembles newline-delimited messages from arbitrary read boundaries.

use bytes::{Bytes, BytesMut};

use crate::error::{Result, ServerError};

/// Message terminator
pub const DELIMITER: u8 = b'\n';

/// Per-connection pending buffer and message splitter
///
/// Bytes pushed after a delimiter stay buffered for the next message, so a
/// single read may yield several messages and a message may span many reads.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received but not yet returned as a message
    pending: BytesMut,

    /// Length of the prefix of `pending` already known to hold no delimiter
    scanned: usize,

    /// Largest delimiter-free prefix tolerated before giving up
    max_pending: usize,
}

impl LineFramer {
    /// Create an empty framer that rejects delimiter-free runs longer than
    /// `max_pending` bytes
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            scanned: 0,
            max_pending,
        }
    }

    /// Buffer freshly received bytes
    ///
    /// Fails with `FrameTooLarge` when the buffer exceeds the limit and
    /// still contains no delimiter.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);

        if self.pending.len() > self.max_pending && self.find_delimiter().is_none() {
            return Err(ServerError::FrameTooLarge {
                pending: self.pending.len(),
                limit: self.max_pending,
            });
        }
        Ok(())
    }

    /// Split off the next complete message, delimiter included
    pub fn next_message(&mut self) -> Option<Bytes> {
        let end = self.find_delimiter()?;
        let message = self.pending.split_to(end + 1).freeze();
        self.scanned = 0;
        Some(message)
    }

    /// Bytes still waiting for a delimiter
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop any partial message
    pub fn clear(&mut self) {
        self.pending.clear();
        self.scanned = 0;
    }

    fn find_delimiter(&mut self) -> Option<usize> {
        match self.pending[self.scanned..]
            .iter()
            .position(|&b| b == DELIMITER)
        {
            Some(offset) => Some(self.scanned + offset),
            None => {
                self.scanned = self.pending.len();
                None
            }
        }
    }
}
