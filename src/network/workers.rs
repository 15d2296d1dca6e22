//! Worker Registry
//!
//! Bookkeeping for connection worker threads.
//!
//! ## Responsibilities
//! - Spawn one thread per connection and keep its record
//! - Collect completion reports and join finished threads
//! - Force every tracked socket closed on shutdown
//! - Join everything that is left exactly once

use std::collections::HashMap;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::Result;
use crate::shutdown::ShutdownFlag;

/// Identifies one connection worker
pub type WorkerId = u64;

/// One in-flight connection worker
struct WorkerRecord {
    /// Thread running the connection
    handle: JoinHandle<()>,

    /// Clone of the worker's socket, used to unblock its receive
    control: TcpStream,

    /// Peer address for logging
    peer: String,
}

/// Sends the worker's id on drop, so completion is reported even if the
/// worker panics
struct CompletionGuard {
    id: WorkerId,
    done_tx: Sender<WorkerId>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let _ = self.done_tx.send(self.id);
    }
}

/// Tracks every live connection worker
///
/// ## Concurrency:
/// - `records`: Mutex held only for map updates and socket shutdowns,
///   never across a join
/// - Completion reports arrive on an unbounded channel and are drained by
///   whoever reaps (the acceptor)
pub struct WorkerRegistry {
    records: Mutex<HashMap<WorkerId, WorkerRecord>>,
    next_id: AtomicU64,
    done_tx: Sender<WorkerId>,
    done_rx: Receiver<WorkerId>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        let (done_tx, done_rx) = channel::unbounded();
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            done_tx,
            done_rx,
        }
    }

    /// Run `work` on a new thread for `stream` and register it
    ///
    /// Returns `Ok(None)` without spawning when shutdown is already under
    /// way; the stream is dropped, which closes the connection. The flag is
    /// checked under the registry lock so a worker is never registered after
    /// `disconnect_all` has run.
    pub fn spawn<F>(
        &self,
        stream: TcpStream,
        peer: String,
        shutdown: &ShutdownFlag,
        work: F,
    ) -> Result<Option<WorkerId>>
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let control = stream.try_clone()?;

        let mut records = self.records.lock();
        if shutdown.is_triggered() {
            return Ok(None);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = CompletionGuard {
            id,
            done_tx: self.done_tx.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                work(stream);
            })?;

        records.insert(
            id,
            WorkerRecord {
                handle,
                control,
                peer,
            },
        );
        Ok(Some(id))
    }

    /// Join every worker that has reported completion
    ///
    /// Never blocks on a running worker. Returns the number joined.
    pub fn reap_finished(&self) -> usize {
        let mut reaped = 0;

        for id in self.done_rx.try_iter() {
            // Unknown ids belong to workers whose thread never started
            let record = self.records.lock().remove(&id);
            if let Some(record) = record {
                join_worker(id, record);
                reaped += 1;
            }
        }
        reaped
    }

    /// Shut down every tracked socket, unblocking pending receives
    ///
    /// Returns the number of workers signalled.
    pub fn disconnect_all(&self) -> usize {
        let records = self.records.lock();

        for (id, record) in records.iter() {
            if let Err(e) = record.control.shutdown(Shutdown::Both) {
                // NotConnected just means the peer already left
                if e.kind() != std::io::ErrorKind::NotConnected {
                    tracing::debug!(worker = id, peer = %record.peer, error = %e, "Socket shutdown failed");
                }
            }
        }
        records.len()
    }

    /// Join every remaining worker, finished or not
    ///
    /// Call after `disconnect_all`, otherwise this waits for clients to
    /// hang up on their own. Returns the number joined.
    pub fn join_all(&self) -> usize {
        let records: Vec<(WorkerId, WorkerRecord)> = self.records.lock().drain().collect();
        let count = records.len();

        for (id, record) in records {
            join_worker(id, record);
        }

        // Reports from the workers just joined
        for _ in self.done_rx.try_iter() {}
        count
    }

    /// Number of registered (not yet reaped) workers
    pub fn active(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active() == 0
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn join_worker(id: WorkerId, record: WorkerRecord) {
    if record.handle.join().is_err() {
        tracing::error!(worker = id, peer = %record.peer, "Connection worker panicked");
    } else {
        tracing::trace!(worker = id, peer = %record.peer, "Joined connection worker");
    }
}
