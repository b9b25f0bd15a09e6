use tracing::{debug, info, warn};

use crate::block::{blocks_needed, BlockId, BlockStore, Geometry};
use crate::cursor::ChainCursor;
use crate::directory::{DirEntry, Directory, EntryStatus, Fd};
use crate::fat::{AllocationTable, FatEntry};
use crate::{Result, StorageError, StoreStats};

/// Owned context holding the block store, allocation table and directory.
///
/// Every engine operation goes through `&mut self`; there is no shared global
/// state, so independent stores can coexist in one process.
#[derive(Debug, Clone)]
pub struct FileStore {
    geometry: Geometry,
    blocks: BlockStore,
    fat: AllocationTable,
    directory: Directory,
}

impl FileStore {
    /// A freshly formatted store: zeroed blocks, all blocks free, no files.
    pub fn format(geometry: Geometry) -> Self {
        info!(
            "Formatting store: {} blocks of {} bytes, {} directory entries",
            geometry.block_count, geometry.block_size, geometry.max_files
        );
        Self {
            blocks: BlockStore::new(&geometry),
            fat: AllocationTable::new(geometry.block_count),
            directory: Directory::new(geometry.max_files),
            geometry,
        }
    }

    pub(crate) fn from_parts(
        geometry: Geometry,
        blocks: BlockStore,
        fat: AllocationTable,
        directory: Directory,
    ) -> Self {
        Self {
            geometry,
            blocks,
            fat,
            directory,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn block_size(&self) -> usize {
        self.geometry.block_size
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn fat(&self) -> &AllocationTable {
        &self.fat
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn entry(&self, fd: Fd) -> Result<&DirEntry> {
        self.directory.entry(fd)
    }

    // Directory lifecycle

    pub fn create(&mut self, name: &str) -> Result<Fd> {
        let fd = self.directory.create(name)?;
        debug!("Created file {} as descriptor {}", name, fd);
        Ok(fd)
    }

    pub fn open(&mut self, fd: Fd) -> Result<()> {
        self.directory.open(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.directory.close(fd)
    }

    pub fn lookup(&self, name: &str) -> Option<Fd> {
        self.directory.lookup(name)
    }

    pub fn size(&self, fd: Fd) -> Result<usize> {
        Ok(self.directory.active(fd)?.size)
    }

    /// Moves the cursor of an open file. Offsets past the end are rejected.
    pub fn seek(&mut self, fd: Fd, offset: usize) -> Result<()> {
        let entry = self.directory.open_entry_mut(fd)?;
        if offset > entry.size {
            return Err(StorageError::SeekOutOfRange {
                fd,
                offset,
                size: entry.size,
            });
        }
        entry.cursor = offset;
        Ok(())
    }

    pub fn files(&self) -> impl Iterator<Item = (Fd, &DirEntry)> {
        self.directory.iter_active()
    }

    // Chain navigation

    pub fn offset_of(&self, fd: Fd) -> Result<usize> {
        Ok(self.directory.active(fd)?.cursor)
    }

    pub fn block_count(&self, fd: Fd) -> Result<usize> {
        Ok(self.directory.active(fd)?.block_count(self.geometry.block_size))
    }

    /// Block at position `n` of the file's chain, found by walking `n` links.
    pub fn nth_block(&self, fd: Fd, n: usize) -> Option<BlockId> {
        let entry = self.directory.active(fd).ok()?;
        self.fat.chain(entry.first_block).nth(n)
    }

    /// All blocks of the file's chain, in order.
    pub fn chain(&self, fd: Fd) -> Vec<BlockId> {
        match self.directory.active(fd) {
            Ok(entry) => self.fat.chain(entry.first_block).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn locate(&self, fd: Fd, offset: usize) -> Option<ChainCursor> {
        let block_size = self.geometry.block_size;
        let block = self.nth_block(fd, offset / block_size)?;
        let cursor = ChainCursor::new(block, offset % block_size, block_size);
        debug!(
            "Descriptor {} offset {} is at {:?}",
            fd,
            offset,
            cursor.position()
        );
        Some(cursor)
    }

    // Transfers

    /// Reads up to `buf.len()` bytes at the file's cursor.
    ///
    /// Returns the number of bytes copied. A short count means end of file;
    /// an invalid descriptor or a file that is not open yields 0.
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> usize {
        let entry = match self.directory.open_entry_mut(fd) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Read rejected: {}", e);
                return 0;
            }
        };
        let cursor = entry.cursor;
        let count = buf.len().min(entry.size.saturating_sub(cursor));
        if count == 0 {
            return 0;
        }

        let Some(start) = self.locate(fd, cursor) else {
            return 0;
        };

        let Self {
            blocks,
            fat,
            directory,
            ..
        } = self;
        let transferred = start.walk(fat, count, |block, local, range| {
            buf[range].copy_from_slice(&blocks.block(block)[local]);
        });

        if let Ok(entry) = directory.entry_mut(fd) {
            entry.cursor += transferred;
        }
        debug!("Read {} of {} bytes from descriptor {}", transferred, buf.len(), fd);
        transferred
    }

    pub fn read_to_vec(&mut self, fd: Fd, count: usize) -> Vec<u8> {
        let mut buf = vec![0; count];
        let transferred = self.read(fd, &mut buf);
        buf.truncate(transferred);
        buf
    }

    /// Writes `buf` at the file's cursor, growing the chain as needed.
    ///
    /// Returns the number of bytes copied. When the allocation table runs out
    /// of free blocks the write continues on the existing chain and the count
    /// comes back short; that is the only signal of exhaustion.
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> usize {
        let block_size = self.geometry.block_size;

        let cursor = {
            let Self { fat, blocks, directory, .. } = self;
            let entry = match directory.open_entry_mut(fd) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Write rejected: {}", e);
                    return 0;
                }
            };
            grow_chain(entry, fat, blocks, block_size, fd, buf.len());
            if entry.first_block.is_none() {
                return 0;
            }
            entry.cursor
        };

        let Some(start) = self.locate(fd, cursor) else {
            return 0;
        };

        let Self {
            blocks,
            fat,
            directory,
            ..
        } = self;
        let transferred = start.walk(fat, buf.len(), |block, local, range| {
            blocks.block_mut(block)[local].copy_from_slice(&buf[range]);
        });

        if let Ok(entry) = directory.entry_mut(fd) {
            entry.cursor += transferred;
            if entry.cursor > entry.size {
                entry.size = entry.cursor;
            }
        }
        debug!("Wrote {} of {} bytes to descriptor {}", transferred, buf.len(), fd);
        transferred
    }

    /// Deletes a closed file and returns its blocks to the allocation table.
    pub fn delete(&mut self, fd: Fd) -> Result<()> {
        let entry = self.directory.entry(fd)?;
        match entry.status {
            EntryStatus::Open => {
                warn!("Attempted to delete an open file descriptor: {}", fd);
                return Err(StorageError::FileOpen(fd));
            }
            EntryStatus::Unused => {
                warn!("Attempted to delete an unused file descriptor: {}", fd);
                return Err(StorageError::FileUnused(fd));
            }
            EntryStatus::Closed => {}
        }

        let chain: Vec<BlockId> = self.fat.chain(entry.first_block).collect();
        for block in &chain {
            self.fat.free(*block);
        }
        self.directory.entry_mut(fd)?.reset();

        info!("Deleted file descriptor {} ({} blocks freed)", fd, chain.len());
        Ok(())
    }

    // Whole-store queries

    pub fn stats(&self) -> StoreStats {
        let free_blocks = self.fat.free_count();
        let (files, bytes_stored) = self
            .files()
            .fold((0, 0), |(files, bytes), (_, entry)| (files + 1, bytes + entry.size));

        StoreStats {
            block_size: self.geometry.block_size,
            total_blocks: self.geometry.block_count,
            free_blocks,
            used_blocks: self.geometry.block_count - free_blocks,
            files,
            bytes_stored,
        }
    }

    /// Verifies the allocation-table invariants against the directory.
    ///
    /// Every live chain must be acyclic, end in `EndOfChain`, be owned by a
    /// single entry and have exactly `block_count(size)` blocks; every block
    /// owned by no entry must be `Free`.
    pub fn check_consistency(&self) -> Result<()> {
        let block_size = self.geometry.block_size;
        let block_count = self.fat.len();
        let mut owners: Vec<Option<Fd>> = vec![None; block_count];

        for (fd, entry) in self.directory.iter_active() {
            if entry.cursor > entry.size {
                return Err(corruption(format!(
                    "descriptor {} cursor {} is past its size {}",
                    fd, entry.cursor, entry.size
                )));
            }

            let mut next = entry.first_block;
            let mut length = 0;
            while let Some(block) = next {
                if block >= block_count {
                    return Err(corruption(format!(
                        "descriptor {} references block {} outside the store",
                        fd, block
                    )));
                }
                if let Some(owner) = owners[block] {
                    return Err(corruption(format!(
                        "block {} reached twice (descriptors {} and {})",
                        block, owner, fd
                    )));
                }
                owners[block] = Some(fd);
                length += 1;

                next = match self.fat.get(block) {
                    FatEntry::Free => {
                        return Err(corruption(format!(
                            "chain of descriptor {} runs through free block {}",
                            fd, block
                        )));
                    }
                    FatEntry::EndOfChain => None,
                    FatEntry::Next(next) => Some(next),
                };
            }

            let expected = blocks_needed(entry.size, block_size);
            if length != expected {
                return Err(corruption(format!(
                    "descriptor {} has {} blocks but size {} needs {}",
                    fd, length, entry.size, expected
                )));
            }
        }

        for (fd, entry) in self.directory.iter_all() {
            if entry.is_unused() && (entry.first_block.is_some() || entry.size != 0) {
                return Err(corruption(format!("unused descriptor {} still holds data", fd)));
            }
        }

        for (block, entry) in self.fat.entries().iter().enumerate() {
            if owners[block].is_none() && *entry != FatEntry::Free {
                return Err(corruption(format!("block {} is allocated but owned by no file", block)));
            }
        }

        Ok(())
    }
}

/// Extends the chain until it can hold `cursor + count` bytes or the table
/// runs dry.
///
/// `size` is first committed to the capacity allocated so far and only then
/// extended past the new block, so it always matches the chain even when an
/// allocation fails partway.
fn grow_chain(
    entry: &mut DirEntry,
    fat: &mut AllocationTable,
    blocks: &mut BlockStore,
    block_size: usize,
    fd: Fd,
    count: usize,
) {
    let end = entry.cursor.saturating_add(count);
    let mut capacity = entry.block_count(block_size) * block_size;
    let mut tail = None;

    while end > capacity {
        entry.size = capacity;

        let Some(new_block) = fat.alloc() else {
            warn!(
                "No free block for descriptor {}: write limited to {} bytes of capacity",
                fd, capacity
            );
            break;
        };
        fat.set(new_block, FatEntry::EndOfChain);
        blocks.zero(new_block);

        match entry.first_block {
            None => entry.first_block = Some(new_block),
            Some(first) => {
                let last = match tail {
                    Some(last) => last,
                    None => fat.chain(Some(first)).last().unwrap_or(first),
                };
                fat.set(last, FatEntry::Next(new_block));
            }
        }
        tail = Some(new_block);

        capacity += block_size;
        if end >= capacity {
            entry.size += block_size;
        } else {
            entry.size += end % block_size;
        }
    }
}

fn corruption(message: String) -> StorageError {
    StorageError::Corruption(message)
}
