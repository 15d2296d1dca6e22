//! Shared server state
//!
//! Everything the acceptor, the workers and the announcer need, built once
//! at startup and shared by `Arc`.

use crate::config::Config;
use crate::shutdown::ShutdownFlag;
use crate::store::Store;

/// State shared by every server thread
pub struct ServerState {
    /// Immutable configuration
    pub config: Config,

    /// The shared append-only log
    pub store: Store,

    /// Set once when the server starts shutting down
    pub shutdown: ShutdownFlag,
}

impl ServerState {
    /// Build state from config
    ///
    /// The store file is not created until the first append.
    pub fn new(config: Config) -> Self {
        let store = Store::new(config.data_file.clone(), config.sync_strategy);
        Self {
            config,
            store,
            shutdown: ShutdownFlag::new(),
        }
    }
}
