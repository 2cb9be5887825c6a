//! End-to-end tests against a real, in-process coordinator: mount, open,
//! read/write, and close across more than one client, plus the
//! disconnection-tolerant paths.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use dfs_client::Session;
use dfs_coordinator::Coordinator;
use dfs_wire::{DfsError, FileMode, BYTES_PER_CHUNK};
use tempfile::tempdir;

static TEST_PORT_COUNTER: AtomicU16 = AtomicU16::new(0);

/// Picks a free loopback port, biased by process id and a rolling
/// counter so concurrently-running tests don't collide.
fn free_addr() -> SocketAddr {
    let pid = std::process::id();
    let base = 31000 + ((pid % 1000) * 20) as u16;
    loop {
        let offset = TEST_PORT_COUNTER.fetch_add(1, Ordering::SeqCst) % 20;
        let port = base + offset;
        if let Ok(listener) = TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
            drop(listener);
            return SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        }
    }
}

/// Spawns a fresh coordinator on a free port and returns its address.
/// Gives the listener a moment to come up before returning.
async fn spawn_coordinator() -> SocketAddr {
    let addr = free_addr();
    tokio::spawn(dfs_coordinator::run(addr, Coordinator::new()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

fn payload(text: &str) -> [u8; BYTES_PER_CHUNK] {
    let mut buf = [0u8; BYTES_PER_CHUNK];
    let bytes = text.as_bytes();
    let n = bytes.len().min(BYTES_PER_CHUNK);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

#[tokio::test]
async fn write_then_read_round_trips_between_clients() {
    let coord_addr = spawn_coordinator().await;

    let writer_dir = tempdir().unwrap();
    let writer = Session::mount(coord_addr, free_addr(), writer_dir.path())
        .await
        .unwrap();
    assert!(writer.is_connected());

    let write_handle = writer.open("alpha", FileMode::Write).await.unwrap();
    write_handle.write(3, &payload("hello")).await.unwrap();
    write_handle.close().await.unwrap();

    let reader_dir = tempdir().unwrap();
    let reader = Session::mount(coord_addr, free_addr(), reader_dir.path())
        .await
        .unwrap();
    assert!(reader.is_connected());

    let read_handle = reader.open("alpha", FileMode::Read).await.unwrap();
    let mut out = [0u8; BYTES_PER_CHUNK];
    read_handle.read(3, &mut out).await.unwrap();
    assert_eq!(&out[..5], b"hello");
    read_handle.close().await.unwrap();

    writer.unmount().await.unwrap();
    reader.unmount().await.unwrap();
}

#[tokio::test]
async fn second_writer_sees_conflict_until_first_closes() {
    let coord_addr = spawn_coordinator().await;

    let a_dir = tempdir().unwrap();
    let a = Session::mount(coord_addr, free_addr(), a_dir.path()).await.unwrap();
    let b_dir = tempdir().unwrap();
    let b = Session::mount(coord_addr, free_addr(), b_dir.path()).await.unwrap();

    let a_handle = a.open("beta", FileMode::Write).await.unwrap();

    let conflict = b.open("beta", FileMode::Write).await;
    assert!(matches!(conflict, Err(DfsError::OpenWriteConflict)));

    a_handle.close().await.unwrap();

    let b_handle = b.open("beta", FileMode::Write).await.unwrap();
    b_handle.close().await.unwrap();

    a.unmount().await.unwrap();
    b.unmount().await.unwrap();
}

#[tokio::test]
async fn write_lock_is_released_on_disconnect() {
    let coord_addr = spawn_coordinator().await;

    let a_dir = tempdir().unwrap();
    let a = Session::mount(coord_addr, free_addr(), a_dir.path()).await.unwrap();
    let b_dir = tempdir().unwrap();
    let b = Session::mount(coord_addr, free_addr(), b_dir.path()).await.unwrap();

    let _a_handle = a.open("gamma", FileMode::Write).await.unwrap();

    // A vanishes without closing its handle first.
    a.unmount().await.unwrap();

    let b_handle = b.open("gamma", FileMode::Write).await.unwrap();
    b_handle.close().await.unwrap();

    b.unmount().await.unwrap();
}

#[tokio::test]
async fn global_file_exists_reflects_first_open() {
    let coord_addr = spawn_coordinator().await;

    let dir = tempdir().unwrap();
    let session = Session::mount(coord_addr, free_addr(), dir.path()).await.unwrap();

    assert!(!session.global_file_exists("delta").await.unwrap());

    let handle = session.open("delta", FileMode::Write).await.unwrap();
    assert!(session.global_file_exists("delta").await.unwrap());
    handle.close().await.unwrap();

    session.unmount().await.unwrap();
}

#[tokio::test]
async fn dread_falls_back_to_local_store_when_coordinator_unreachable() {
    let coord_addr = spawn_coordinator().await;

    let dir = tempdir().unwrap();
    let local_path = dir.path().to_path_buf();

    let session = Session::mount(coord_addr, free_addr(), &local_path).await.unwrap();
    let handle = session.open("epsilon", FileMode::Write).await.unwrap();
    handle.write(0, &payload("stale-ok")).await.unwrap();
    handle.close().await.unwrap();
    session.unmount().await.unwrap();

    // Nothing listens at this address; the mount must still succeed and
    // fall back to DREAD-only behaviour against the local slab.
    let dead_coord = free_addr();
    let offline = Session::mount(dead_coord, free_addr(), &local_path).await.unwrap();
    assert!(!offline.is_connected());

    let handle = offline.open("epsilon", FileMode::Dread).await.unwrap();
    let mut out = [0u8; BYTES_PER_CHUNK];
    handle.read(0, &mut out).await.unwrap();
    assert_eq!(&out[..8], b"stale-ok");
    handle.close().await.unwrap();
}

#[tokio::test]
async fn dread_open_without_local_or_remote_copy_fails() {
    let dir = tempdir().unwrap();
    let dead_coord = free_addr();
    let session = Session::mount(dead_coord, free_addr(), dir.path()).await.unwrap();
    assert!(!session.is_connected());

    let result = session.open("zeta", FileMode::Dread).await;
    assert!(matches!(result, Err(DfsError::FileDoesNotExist)));
}

#[tokio::test]
async fn open_rejects_invalid_filename() {
    let coord_addr = spawn_coordinator().await;

    let dir = tempdir().unwrap();
    let session = Session::mount(coord_addr, free_addr(), dir.path()).await.unwrap();

    let result = session.open("invalid file;", FileMode::Write).await;
    assert!(matches!(result, Err(DfsError::BadFilename)));

    session.unmount().await.unwrap();
}

#[tokio::test]
async fn identity_is_preserved_across_a_remount() {
    let coord_addr = spawn_coordinator().await;

    let dir = tempdir().unwrap();
    let first = Session::mount(coord_addr, free_addr(), dir.path()).await.unwrap();
    first.unmount().await.unwrap();
    let cached = std::fs::read_to_string(dir.path().join(dfs_wire::CLIENT_ID_FILE)).unwrap();

    let second = Session::mount(coord_addr, free_addr(), dir.path()).await.unwrap();
    second.unmount().await.unwrap();
    let cached_again = std::fs::read_to_string(dir.path().join(dfs_wire::CLIENT_ID_FILE)).unwrap();

    assert_eq!(cached, cached_again);
}

#[tokio::test]
async fn second_writer_is_visible_after_first_unmounts() {
    let coord_addr = spawn_coordinator().await;

    let a_dir = tempdir().unwrap();
    let a = Session::mount(coord_addr, free_addr(), a_dir.path()).await.unwrap();
    let a_handle = a.open("theta", FileMode::Write).await.unwrap();
    a_handle.write(3, &payload("from-a")).await.unwrap();
    a_handle.close().await.unwrap();
    a.unmount().await.unwrap();

    let b_dir = tempdir().unwrap();
    let b = Session::mount(coord_addr, free_addr(), b_dir.path()).await.unwrap();
    let b_handle = b.open("theta", FileMode::Write).await.unwrap();
    b_handle.write(3, &payload("from-b")).await.unwrap();
    b_handle.close().await.unwrap();

    let c_dir = tempdir().unwrap();
    let c = Session::mount(coord_addr, free_addr(), c_dir.path()).await.unwrap();
    let c_handle = c.open("theta", FileMode::Read).await.unwrap();
    let mut out = [0u8; BYTES_PER_CHUNK];
    c_handle.read(3, &mut out).await.unwrap();
    assert_eq!(&out[..6], b"from-b");
    c_handle.close().await.unwrap();

    b.unmount().await.unwrap();
    c.unmount().await.unwrap();
}

#[tokio::test]
async fn write_outside_write_mode_is_rejected() {
    let coord_addr = spawn_coordinator().await;

    let dir = tempdir().unwrap();
    let session = Session::mount(coord_addr, free_addr(), dir.path()).await.unwrap();
    let handle = session.open("eta", FileMode::Write).await.unwrap();
    handle.write(0, &payload("x")).await.unwrap();
    handle.close().await.unwrap();

    let read_handle = session.open("eta", FileMode::Read).await.unwrap();
    let result = read_handle.write(0, &payload("y")).await;
    assert!(matches!(result, Err(DfsError::BadFileMode)));

    session.unmount().await.unwrap();
}
