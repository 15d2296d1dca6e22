//! # linelog
//!
//! A concurrent TCP server around a shared append-only log:
//! - Newline-delimited messages reassembled per connection
//! - Every message appended to one file-backed store under a single lock
//! - The full store echoed back after each append
//! - A background announcer appending timestamps
//! - Graceful shutdown on SIGINT/SIGTERM that joins every thread and
//!   removes the store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Acceptor (main thread)                     │
//! │          accept → spawn worker → reap finished              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one thread per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Connection Workers                          │
//! │        LineFramer → append → read_all → echo                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Store    │◄─────────│  Announcer  │
//!   │   (Mutex)   │  append  │  (thread)   │
//!   └─────────────┘          └─────────────┘
//!
//!   Signal listener ──► ShutdownHandle ──► flag + socket shutdowns
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod shutdown;
pub mod state;
pub mod announcer;
pub mod network;
pub mod signal;
pub mod daemon;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ServerError, Result};
pub use config::Config;
pub use network::{Server, ShutdownHandle};
pub use state::ServerState;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of linelog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
