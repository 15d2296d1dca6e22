//! Error types for linelog
//!
//! Provides a unified error type for all server operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ServerError
pub type Result<T> = std::result::Result<T, ServerError>;

/// Unified error type for linelog operations
#[derive(Debug, Error)]
pub enum ServerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install signal mask: {0}")]
    Signal(#[source] io::Error),

    #[error("Daemonize failed: {0}")]
    Daemonize(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Runtime Errors
    // -------------------------------------------------------------------------
    #[error("Accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("Receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("Send failed: {0}")]
    Send(#[source] io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store write to {} failed: {source}", .path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Store read from {} failed: {source}", .path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Pending message too large: {pending} bytes without a delimiter (max {limit})")]
    FrameTooLarge { pending: usize, limit: usize },
}

impl ServerError {
    /// True when the error means the peer went away rather than a server fault
    pub fn is_disconnect(&self) -> bool {
        let io_err = match self {
            ServerError::Io(e) | ServerError::Receive(e) | ServerError::Send(e) => e,
            _ => return false,
        };

        matches!(
            io_err.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::NotConnected
        )
    }
}
