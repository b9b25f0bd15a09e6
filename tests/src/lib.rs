//! Shared fixtures for the fatstore integration tests.

use storage::{Fd, FileStore, Geometry};

/// Installs a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn store(block_size: usize, block_count: usize, max_files: usize) -> FileStore {
    let geometry = Geometry::new(block_size, block_count, max_files)
        .expect("test geometry must be valid");
    FileStore::format(geometry)
}

/// Creates `name` and leaves it open.
pub fn open_new(store: &mut FileStore, name: &str) -> Fd {
    let fd = store.create(name).expect("create test file");
    store.open(fd).expect("open test file");
    fd
}

/// Deterministic, non-repeating-per-block byte pattern.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

/// Takes `count` free blocks out of circulation by filling a scratch file.
pub fn consume_blocks(store: &mut FileStore, count: usize) -> Fd {
    let fd = open_new(store, "scratch");
    let bytes = count * store.block_size();
    assert_eq!(store.write(fd, &vec![0xEE; bytes]), bytes);
    store.close(fd).expect("close scratch file");
    fd
}
