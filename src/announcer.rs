//! Periodic Announcer
//!
//! Background thread that appends a timestamp record to the store on a
//! fixed period for the life of the server.

use std::fmt::Display;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Local, TimeZone};

use crate::error::Result;
use crate::state::ServerState;

/// strftime layout of the timestamp body (RFC 2822 style)
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Record appended for `now`, e.g. `timestamp:Sun, 18 Oct 2026 09:30:00 +0000\n`
pub fn timestamp_record<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("timestamp:{}\n", now.format(TIMESTAMP_FORMAT))
}

/// Start the announcer thread
///
/// The thread sleeps one `announce_interval` before each record and exits,
/// without a final record, as soon as shutdown is triggered.
pub fn spawn(state: Arc<ServerState>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("announcer".to_string())
        .spawn(move || run(&state))?;
    Ok(handle)
}

fn run(state: &ServerState) {
    let interval = state.config.announce_interval;
    tracing::debug!(?interval, "Announcer started");

    while !state.shutdown.wait_timeout(interval) {
        let record = timestamp_record(&Local::now());
        match state.store.append(record.as_bytes()) {
            Ok(()) => tracing::debug!(record = record.trim_end(), "Appended timestamp"),
            Err(e) => tracing::error!(error = %e, "Failed to append timestamp"),
        }
    }

    tracing::debug!("Announcer stopped");
}
