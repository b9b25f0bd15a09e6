use fatstore_tests::{consume_blocks, init_tracing, open_new, pattern, store};
use storage::{blocks_needed, EntryStatus, FatEntry, StorageError};

#[test]
fn test_write_fills_two_blocks_then_runs_dry() {
    init_tracing();
    let mut store = store(4, 2, 4);
    let fd = open_new(&mut store, "letters");

    assert_eq!(store.write(fd, b"ABCDEFGH"), 8);
    assert_eq!(store.size(fd).unwrap(), 8);
    assert_eq!(store.chain(fd).len(), 2);
    assert_eq!(store.fat().free_count(), 0);

    assert_eq!(store.write(fd, b"IJKL"), 0);
    assert_eq!(store.size(fd).unwrap(), 8);
    assert_eq!(store.offset_of(fd).unwrap(), 8);

    store.seek(fd, 0).unwrap();
    assert_eq!(store.read_to_vec(fd, 12), b"ABCDEFGH");
    store.check_consistency().unwrap();
}

#[test]
fn test_delete_open_entry_changes_nothing() {
    init_tracing();
    let mut store = store(4, 4, 4);
    let fd = open_new(&mut store, "busy");
    store.write(fd, b"012345");

    let entry_before = store.entry(fd).unwrap().clone();
    let fat_before: Vec<FatEntry> = (0..4).map(|b| store.fat().get(b)).collect();

    assert!(matches!(store.delete(fd), Err(StorageError::FileOpen(_))));

    let fat_after: Vec<FatEntry> = (0..4).map(|b| store.fat().get(b)).collect();
    assert_eq!(store.entry(fd).unwrap(), &entry_before);
    assert_eq!(fat_after, fat_before);
}

#[test]
fn test_delete_unused_entry_is_diagnosed() {
    let mut store = store(4, 4, 4);
    assert!(matches!(store.delete(2), Err(StorageError::FileUnused(2))));
    assert!(matches!(store.delete(4), Err(StorageError::InvalidDescriptor(4))));
}

#[test]
fn test_delete_closed_empty_entry() {
    let mut store = store(4, 4, 4);
    let fd = store.create("empty").unwrap();

    store.delete(fd).unwrap();

    let entry = store.entry(fd).unwrap();
    assert_eq!(entry.status(), EntryStatus::Unused);
    assert_eq!(entry.first_block(), None);
    assert_eq!(entry.size(), 0);
    assert_eq!(entry.cursor(), 0);
    assert_eq!(store.fat().free_count(), 4);
}

#[test]
fn test_delete_frees_exactly_the_chain() {
    let mut store = store(4, 6, 4);
    let a = open_new(&mut store, "a");
    let b = open_new(&mut store, "b");

    // Interleave growth so the two chains alternate through the table.
    store.write(a, b"aaaa");
    store.write(b, b"bbbb");
    store.write(a, b"AAAA");
    store.write(b, b"BBBB");
    assert_eq!(store.chain(a), vec![0, 2]);
    assert_eq!(store.chain(b), vec![1, 3]);

    store.close(a).unwrap();
    store.delete(a).unwrap();

    assert_eq!(store.fat().get(0), FatEntry::Free);
    assert_eq!(store.fat().get(2), FatEntry::Free);
    assert_eq!(store.fat().get(1), FatEntry::Next(3));
    assert_eq!(store.fat().get(3), FatEntry::EndOfChain);
    assert_eq!(store.fat().free_count(), 4);

    store.seek(b, 0).unwrap();
    assert_eq!(store.read_to_vec(b, 8), b"bbbbBBBB");
    store.check_consistency().unwrap();
}

#[test]
fn test_nth_block_past_chain_is_none() {
    let mut store = store(4, 8, 4);
    let empty = store.create("empty").unwrap();
    let full = open_new(&mut store, "full");
    store.write(full, &pattern(10));

    assert_eq!(store.nth_block(empty, 0), None);
    assert_eq!(store.nth_block(full, 0), Some(0));
    assert_eq!(store.nth_block(full, 2), Some(2));
    assert_eq!(store.nth_block(full, 3), None);
    assert_eq!(store.nth_block(3, 0), None);
    assert_eq!(store.nth_block(42, 0), None);
}

#[test]
fn test_offset_of_rejects_unused_and_out_of_range() {
    let mut store = store(4, 4, 2);
    let fd = open_new(&mut store, "f");
    store.write(fd, b"xyz");

    assert_eq!(store.offset_of(fd).unwrap(), 3);
    assert!(matches!(store.offset_of(1), Err(StorageError::InvalidDescriptor(1))));
    assert!(matches!(store.offset_of(2), Err(StorageError::InvalidDescriptor(2))));
}

#[test]
fn test_write_sizes_match_block_counts() {
    for n in [0usize, 1, 3, 4, 5, 8, 9, 31, 32, 33] {
        let mut store = store(4, 16, 2);
        let fd = open_new(&mut store, "f");

        assert_eq!(store.write(fd, &pattern(n)), n);
        assert_eq!(store.size(fd).unwrap(), n);
        assert_eq!(store.block_count(fd).unwrap(), blocks_needed(n, 4));
        assert_eq!(store.chain(fd).len(), blocks_needed(n, 4));
    }
}

#[test]
fn test_partial_growth_sizes_to_grown_capacity() {
    init_tracing();
    let mut store = store(4, 4, 4);
    let fd = open_new(&mut store, "f");
    store.write(fd, b"01234");
    consume_blocks(&mut store, 1);
    assert_eq!(store.fat().free_count(), 1);

    // 2 existing blocks plus 1 grown block = 12 bytes of capacity.
    let written = store.write(fd, &pattern(20));
    assert_eq!(written, 7);
    assert_eq!(store.size(fd).unwrap(), 12);
    assert_eq!(store.chain(fd).len(), 3);
    assert_eq!(store.offset_of(fd).unwrap(), 12);
    store.check_consistency().unwrap();
}

#[test]
fn test_exhausted_empty_file_writes_nothing() {
    let mut store = store(4, 2, 4);
    consume_blocks(&mut store, 2);
    let fd = open_new(&mut store, "f");

    assert_eq!(store.write(fd, b"data"), 0);
    assert_eq!(store.size(fd).unwrap(), 0);
    assert_eq!(store.entry(fd).unwrap().first_block(), None);
    assert_eq!(store.read_to_vec(fd, 4), Vec::<u8>::new());
}

#[test]
fn test_read_at_size_does_not_move_cursor() {
    let mut store = store(4, 4, 2);
    let fd = open_new(&mut store, "f");
    store.write(fd, b"abcdef");

    let mut buf = [0u8; 8];
    assert_eq!(store.read(fd, &mut buf), 0);
    assert_eq!(store.offset_of(fd).unwrap(), 6);

    store.seek(fd, 4).unwrap();
    assert_eq!(store.read(fd, &mut buf), 2);
    assert_eq!(&buf[..2], b"ef");
    assert_eq!(store.offset_of(fd).unwrap(), 6);
}

#[test]
fn test_reopen_resets_cursor() {
    let mut store = store(4, 4, 2);
    let fd = open_new(&mut store, "f");
    store.write(fd, b"abc");
    store.close(fd).unwrap();

    assert_eq!(store.read(fd, &mut [0u8; 3]), 0);
    store.open(fd).unwrap();
    assert_eq!(store.offset_of(fd).unwrap(), 0);
    assert_eq!(store.read_to_vec(fd, 3), b"abc");
}

#[test]
fn test_deleted_blocks_are_reused_clean() {
    let mut store = store(4, 2, 2);
    let old = open_new(&mut store, "old");
    store.write(old, b"secrets!");
    store.close(old).unwrap();
    store.delete(old).unwrap();

    let fd = open_new(&mut store, "new");
    assert_eq!(store.write(fd, b"hi"), 2);
    assert_eq!(store.blocks().block(store.nth_block(fd, 0).unwrap()), b"hi\0\0");
}
