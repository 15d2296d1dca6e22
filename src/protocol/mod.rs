//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! ### Request
//! An unstructured byte stream. Every `\n` closes one message, which
//! includes the delimiter:
//! ```text
//! ┌─────────────────────────┬────┬─────────────────────────┬────┬──────────
//! │      message bytes      │ \n │      message bytes      │ \n │ partial..
//! └─────────────────────────┴────┴─────────────────────────┴────┴──────────
//! ```
//!
//! ### Response
//! After each message is appended, the full store contents, unframed.

mod framing;

pub use framing::{LineFramer, DELIMITER};
