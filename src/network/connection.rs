//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::protocol::LineFramer;
use crate::state::ServerState;

/// Why a connection ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed its side
    PeerClosed,

    /// The server is shutting down
    Shutdown,
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream, used for both directions
    stream: TcpStream,

    /// Bytes received but not yet forming a message
    framer: LineFramer,

    /// Store, config and shutdown flag
    state: Arc<ServerState>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, peer_addr: String, state: Arc<ServerState>) -> Result<Self> {
        // Echoes go out as soon as they are written
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            framer: LineFramer::new(state.config.max_pending_bytes),
            state,
            peer_addr,
        })
    }

    /// Serve the connection to completion, then close it
    ///
    /// Errors are logged here and never propagate past this connection.
    pub fn run(mut self) {
        match self.handle() {
            Ok(reason) => {
                tracing::debug!(peer = %self.peer_addr, ?reason, "Connection closed");
            }
            Err(e) if e.is_disconnect() => {
                tracing::debug!(peer = %self.peer_addr, error = %e, "Client disconnected");
            }
            Err(e) => {
                tracing::warn!(peer = %self.peer_addr, error = %e, "Connection error");
            }
        }

        if !self.framer.is_empty() {
            tracing::debug!(
                peer = %self.peer_addr,
                bytes = self.framer.pending_len(),
                "Discarding incomplete message"
            );
        }
        self.framer.clear();

        let _ = self.stream.shutdown(Shutdown::Both);
        tracing::info!(peer = %self.peer_addr, "Closed connection");
    }

    /// Receive, append and echo until the peer leaves or shutdown begins
    ///
    /// Every complete message is appended on its own and followed by an
    /// echo of the whole store as read after that append.
    pub fn handle(&mut self) -> Result<CloseReason> {
        let mut chunk = vec![0u8; self.state.config.recv_buffer_size];

        loop {
            if self.state.shutdown.is_triggered() {
                return Ok(CloseReason::Shutdown);
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(self.close_reason()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // Our own socket shutdown surfaces as an error on some platforms
                Err(_) if self.state.shutdown.is_triggered() => return Ok(CloseReason::Shutdown),
                Err(e) => return Err(ServerError::Receive(e)),
            };

            tracing::trace!(peer = %self.peer_addr, bytes = n, "Received");
            self.framer.push(&chunk[..n])?;

            let mut completed = 0;
            while let Some(message) = self.framer.next_message() {
                self.process_message(&message)?;
                completed += 1;
            }

            if completed == 0 {
                tracing::trace!(
                    peer = %self.peer_addr,
                    pending = self.framer.pending_len(),
                    "Message not complete yet"
                );
            }
        }
    }

    /// Append one message, then send back the full store
    fn process_message(&mut self, message: &[u8]) -> Result<()> {
        self.state.store.append(message)?;

        // Snapshot is copied out so the store lock is not held during the send
        let snapshot = self.state.store.read_all()?;
        self.stream.write_all(&snapshot).map_err(ServerError::Send)?;

        tracing::debug!(
            peer = %self.peer_addr,
            message_bytes = message.len(),
            echoed_bytes = snapshot.len(),
            "Appended message and echoed store"
        );
        Ok(())
    }

    fn close_reason(&self) -> CloseReason {
        if self.state.shutdown.is_triggered() {
            CloseReason::Shutdown
        } else {
            CloseReason::PeerClosed
        }
    }
}
