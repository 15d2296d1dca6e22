//! Store Module
//!
//! The shared append-only byte log every connection writes to and echoes.
//!
//! ## Responsibilities
//! - Append complete messages under a single exclusive lock
//! - Return full-content snapshots for echoing
//! - Roll back a failed append so no torn message is ever visible
//! - Remove the backing file on shutdown
//!
//! ## File Format
//! Raw concatenation of messages, no framing or checksums:
//! ```text
//! ┌──────────────┬──────────────┬───────────────────────────────┐
//! │ "hello\n"    │ "world\n"    │ "timestamp:Sun, 18 Oct ...\n" │
//! └──────────────┴──────────────┴───────────────────────────────┘
//! ```

mod file;

pub use file::Store;
