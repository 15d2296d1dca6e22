//! Tests for the worker registry
//!
//! These tests verify:
//! - Spawned workers are tracked until reaped
//! - Reaping joins only finished workers
//! - disconnect_all unblocks workers stuck in receive
//! - No registration once shutdown has started

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use linelog::network::WorkerRegistry;
use linelog::shutdown::ShutdownFlag;

// =============================================================================
// Helper Functions
// =============================================================================

/// Connected (client, server-side) socket pair
fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server_side, _) = listener.accept().unwrap();
    (client, server_side)
}

/// Worker body that blocks in receive until the socket closes
fn read_until_closed(mut stream: TcpStream) {
    let mut buf = [0u8; 64];
    while let Ok(n) = stream.read(&mut buf) {
        if n == 0 {
            break;
        }
    }
}

fn reap_until(registry: &WorkerRegistry, expected_active: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while registry.active() != expected_active && Instant::now() < deadline {
        registry.reap_finished();
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(registry.active(), expected_active);
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_spawn_registers_worker() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();
    let (_client, server_side) = socket_pair();

    let id = registry
        .spawn(server_side, "peer".to_string(), &shutdown, read_until_closed)
        .unwrap();

    assert!(id.is_some());
    assert_eq!(registry.active(), 1);

    registry.disconnect_all();
    assert_eq!(registry.join_all(), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_ids_are_unique() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();

    let ids: Vec<_> = (0..5)
        .map(|_| {
            let (_client, server_side) = socket_pair();
            registry
                .spawn(server_side, "peer".to_string(), &shutdown, |_| {})
                .unwrap()
                .unwrap()
        })
        .collect();

    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());

    registry.join_all();
}

#[test]
fn test_reap_joins_only_finished_workers() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();

    let (finishing_client, finishing_side) = socket_pair();
    let (_idle_client, idle_side) = socket_pair();

    registry
        .spawn(finishing_side, "finishing".to_string(), &shutdown, read_until_closed)
        .unwrap();
    registry
        .spawn(idle_side, "idle".to_string(), &shutdown, read_until_closed)
        .unwrap();
    assert_eq!(registry.active(), 2);

    drop(finishing_client);
    reap_until(&registry, 1);

    registry.disconnect_all();
    assert_eq!(registry.join_all(), 1);
}

#[test]
fn test_reap_with_nothing_finished_does_not_block() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();
    let (_client, server_side) = socket_pair();

    registry
        .spawn(server_side, "peer".to_string(), &shutdown, read_until_closed)
        .unwrap();

    let start = Instant::now();
    assert_eq!(registry.reap_finished(), 0);
    assert!(start.elapsed() < Duration::from_secs(1));

    registry.disconnect_all();
    registry.join_all();
}

#[test]
fn test_disconnect_all_unblocks_receives() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();
    let (done_tx, done_rx) = mpsc::channel();

    let clients: Vec<TcpStream> = (0..4)
        .map(|_| {
            let (client, server_side) = socket_pair();
            let done_tx = done_tx.clone();
            registry
                .spawn(server_side, "peer".to_string(), &shutdown, move |stream| {
                    read_until_closed(stream);
                    done_tx.send(()).unwrap();
                })
                .unwrap();
            client
        })
        .collect();

    assert_eq!(registry.disconnect_all(), 4);
    for _ in 0..4 {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    assert_eq!(registry.join_all(), 4);
    drop(clients);
}

#[test]
fn test_no_spawn_after_shutdown() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();
    shutdown.trigger();

    let (mut client, server_side) = socket_pair();
    let id = registry
        .spawn(server_side, "late".to_string(), &shutdown, |_| panic!("must not run"))
        .unwrap();

    assert!(id.is_none());
    assert!(registry.is_empty());

    // The rejected connection is closed
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = [0u8; 1];
    assert!(matches!(client.read(&mut buf), Ok(0) | Err(_)));
}

#[test]
fn test_panicking_worker_is_still_reaped() {
    let registry = WorkerRegistry::new();
    let shutdown = ShutdownFlag::new();
    let (_client, server_side) = socket_pair();

    registry
        .spawn(server_side, "peer".to_string(), &shutdown, |_| panic!("worker failure"))
        .unwrap();

    reap_until(&registry, 0);
}
