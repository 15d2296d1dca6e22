//! Network Module
//!
//! TCP server, connection handling and worker lifecycle.
//!
//! ## Architecture
//! - Acceptor loop on the calling thread
//! - One OS thread per connection, tracked in a `WorkerRegistry`
//! - Finished workers are reaped after every accept
//! - `ShutdownHandle` unblocks accept and every receive on shutdown

mod listener;
mod server;
mod connection;
mod workers;

pub use listener::Listener;
pub use server::{Server, ShutdownHandle};
pub use connection::{CloseReason, Connection};
pub use workers::{WorkerId, WorkerRegistry};
