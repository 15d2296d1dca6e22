//! TCP Server
//!
//! Accepts connections, dispatches them to worker threads and runs the
//! shutdown sequence once the accept loop ends.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;

use socket2::{Domain, Protocol, Socket, Type};

use crate::announcer;
use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::state::ServerState;

use super::{Connection, Listener, WorkerRegistry};

/// TCP server for linelog
pub struct Server {
    /// Config, store and shutdown flag shared with every thread
    state: Arc<ServerState>,

    /// Bound, listening endpoint
    listener: Arc<dyn Listener>,

    /// Address actually bound (resolves port 0)
    local_addr: SocketAddr,

    /// Live connection workers
    workers: Arc<WorkerRegistry>,
}

impl Server {
    /// Bind and listen according to `config`
    ///
    /// Nothing is spawned yet, so this is safe to call before daemonizing.
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let listener = bind_listener(&config)?;
        Self::with_listener(config, Arc::new(listener))
    }

    /// Serve on an already-listening endpoint
    ///
    /// `config`'s network fields other than the buffer sizes are ignored.
    pub fn with_listener(config: Config, listener: Arc<dyn Listener>) -> Result<Self> {
        config.validate()?;

        let local_addr = listener.local_addr()?;
        let state = Arc::new(ServerState::new(config));

        if state.store.exists() {
            tracing::warn!(
                path = %state.store.path().display(),
                "Store file already exists, new messages will be appended to it"
            );
        }

        tracing::info!(address = %local_addr, backlog = state.config.backlog, "Server listening");

        Ok(Self {
            state,
            listener,
            local_addr,
            workers: Arc::new(WorkerRegistry::new()),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state (store, config, shutdown flag)
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Handle that can stop this server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            state: Arc::clone(&self.state),
            listener: Arc::clone(&self.listener),
            workers: Arc::clone(&self.workers),
        }
    }

    /// Serve until shutdown (blocking)
    ///
    /// Starts the announcer, runs the accept loop, then stops everything:
    /// unblocks pending calls, joins the announcer and every worker, and
    /// removes the store file. Returns `Ok(())` for a requested shutdown and
    /// the accept error if accept failed on its own.
    pub fn run(self) -> Result<()> {
        let announcer = match announcer::spawn(Arc::clone(&self.state)) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start announcer");
                self.finish(None);
                return Err(e);
            }
        };

        let outcome = self.accept_loop();
        self.finish(Some(announcer));
        outcome
    }

    fn accept_loop(&self) -> Result<()> {
        loop {
            if self.state.shutdown.is_triggered() {
                tracing::info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }

            let (stream, addr) = match self.listener.accept() {
                Ok(conn) => conn,
                // Listener was shut down by the shutdown handle
                Err(_) if self.state.shutdown.is_triggered() => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, shutting down");
                    return Err(ServerError::Accept(e));
                }
            };

            let peer = addr
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::info!(peer = %peer, "Accepted connection");

            self.spawn_worker(stream, peer);

            let reaped = self.workers.reap_finished();
            if reaped > 0 {
                tracing::debug!(reaped, active = self.workers.active(), "Reaped finished workers");
            }
        }
    }

    fn spawn_worker(&self, stream: TcpStream, peer: String) {
        let state = Arc::clone(&self.state);
        let worker_peer = peer.clone();

        let spawned = self.workers.spawn(stream, peer.clone(), &self.state.shutdown, move |stream| {
            match Connection::new(stream, worker_peer.clone(), state) {
                Ok(connection) => connection.run(),
                Err(e) => tracing::warn!(peer = %worker_peer, error = %e, "Failed to set up connection"),
            }
        });

        match spawned {
            Ok(Some(id)) => tracing::debug!(worker = id, peer = %peer, "Spawned connection worker"),
            Ok(None) => tracing::debug!(peer = %peer, "Dropped connection accepted during shutdown"),
            Err(e) => tracing::warn!(peer = %peer, error = %e, "Failed to start connection worker"),
        }
    }

    /// Stop and release everything; runs once, from `run`
    fn finish(&self, announcer: Option<JoinHandle<()>>) {
        let handle = self.shutdown_handle();
        handle.trigger();

        // Another thread may have won the trigger and not yet reached its
        // socket shutdowns; repeat them so no join below can block on an
        // idle client.
        handle.unblock();

        if let Some(handle) = announcer {
            if handle.join().is_err() {
                tracing::error!("Announcer thread panicked");
            }
        }

        let joined = self.workers.join_all();
        tracing::info!(workers = joined, "Joined connection workers");

        match self.state.store.remove() {
            Ok(true) => tracing::info!(path = %self.state.store.path().display(), "Removed store file"),
            Ok(false) => tracing::debug!("No store file to remove"),
            Err(e) => tracing::error!(error = %e, "Failed to remove store file"),
        }
    }
}

/// Cloneable trigger for a running server's shutdown
///
/// Triggering sets the shutdown flag, shuts the listening socket down so a
/// blocked accept returns, and shuts down every registered connection so
/// blocked receives return. Later triggers do nothing.
#[derive(Clone)]
pub struct ShutdownHandle {
    state: Arc<ServerState>,
    listener: Arc<dyn Listener>,
    workers: Arc<WorkerRegistry>,
}

impl ShutdownHandle {
    /// Start shutdown; returns `true` for the call that actually did it
    pub fn trigger(&self) -> bool {
        if !self.state.shutdown.trigger() {
            return false;
        }

        tracing::info!("Shutting down");
        self.unblock();
        true
    }

    /// Wake a blocked accept and every blocked receive
    ///
    /// Safe to repeat: already shut-down sockets are skipped quietly.
    fn unblock(&self) {
        if let Err(e) = self.listener.shutdown() {
            tracing::debug!(error = %e, "Listener shutdown failed");
        }

        let signalled = self.workers.disconnect_all();
        tracing::debug!(workers = signalled, "Disconnected active workers");
    }

    /// Whether shutdown has started
    pub fn is_triggered(&self) -> bool {
        self.state.shutdown.is_triggered()
    }

    /// Workers registered and not yet reaped
    pub fn active_workers(&self) -> usize {
        self.workers.active()
    }
}

// =============================================================================
// Listener Setup
// =============================================================================

/// Bind the configured host, or every interface (IPv6 dual-stack first,
/// then IPv4)
fn bind_listener(config: &Config) -> Result<Socket> {
    let candidates = match config.bind_host {
        Some(host) => vec![SocketAddr::new(host, config.port)],
        None => vec![
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), config.port),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port),
        ],
    };

    let mut last_error = None;
    for addr in candidates {
        match open_listener(addr, config.backlog) {
            Ok(socket) => return Ok(socket),
            Err(e) => {
                tracing::debug!(address = %addr, error = %e, "Bind attempt failed");
                last_error = Some((addr, e));
            }
        }
    }

    match last_error {
        Some((addr, source)) => {
            tracing::error!(address = %addr, error = %source, "Bind failed");
            Err(ServerError::Bind {
                addr: addr.to_string(),
                source,
            })
        }
        None => Err(ServerError::Config("no address to bind".to_string())),
    }
}

fn open_listener(addr: SocketAddr, backlog: i32) -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    if addr.is_ipv6() && addr.ip().is_unspecified() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket)
}
