use serde::{Deserialize, Serialize};

use crate::block::BlockId;

/// One allocation-table slot per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatEntry {
    Free,
    EndOfChain,
    Next(BlockId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTable {
    entries: Vec<FatEntry>,
}

impl AllocationTable {
    pub fn new(block_count: usize) -> Self {
        Self {
            entries: vec![FatEntry::Free; block_count],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, block: BlockId) -> FatEntry {
        self.entries[block]
    }

    pub fn set(&mut self, block: BlockId, entry: FatEntry) {
        self.entries[block] = entry;
    }

    /// Block following `block` in its chain, if any.
    pub fn next(&self, block: BlockId) -> Option<BlockId> {
        match self.entries[block] {
            FatEntry::Next(next) => Some(next),
            FatEntry::Free | FatEntry::EndOfChain => None,
        }
    }

    /// First-fit: takes the lowest free block and marks it `EndOfChain`.
    pub fn alloc(&mut self) -> Option<BlockId> {
        let block = self.entries.iter().position(|e| *e == FatEntry::Free)?;
        self.entries[block] = FatEntry::EndOfChain;
        Some(block)
    }

    pub fn free(&mut self, block: BlockId) {
        self.entries[block] = FatEntry::Free;
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|e| **e == FatEntry::Free).count()
    }

    /// Iterates the chain starting at `first`.
    ///
    /// The walk is capped at the table length so a corrupted, cyclic table
    /// cannot hang the caller; `FileStore::check_consistency` reports such
    /// tables as corrupt.
    pub fn chain(&self, first: Option<BlockId>) -> Chain<'_> {
        Chain {
            table: self,
            next: first,
            remaining: self.entries.len(),
        }
    }

    pub(crate) fn entries(&self) -> &[FatEntry] {
        &self.entries
    }
}

pub struct Chain<'a> {
    table: &'a AllocationTable,
    next: Option<BlockId>,
    remaining: usize,
}

impl Iterator for Chain<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        if self.remaining == 0 {
            return None;
        }
        let block = self.next?;
        self.remaining -= 1;
        self.next = self.table.next(block);
        Some(block)
    }
}
