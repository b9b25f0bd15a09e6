use std::ops::Range;

use crate::block::BlockId;
use crate::fat::AllocationTable;

/// Position inside a chain: the current block and the offset within it.
///
/// Read and write both drive their byte copies through `walk`, so the
/// block-boundary crossing lives here only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChainCursor {
    block: BlockId,
    local: usize,
    block_size: usize,
}

impl ChainCursor {
    pub(crate) fn new(block: BlockId, local: usize, block_size: usize) -> Self {
        debug_assert!(local < block_size);
        Self {
            block,
            local,
            block_size,
        }
    }

    pub(crate) fn position(&self) -> (BlockId, usize) {
        (self.block, self.local)
    }

    pub(crate) fn remaining_in_block(&self) -> usize {
        self.block_size - self.local
    }

    pub(crate) fn has_more_in_block(&self) -> bool {
        self.local < self.block_size
    }

    /// Steps onto the next block of the chain. Returns false at end of chain.
    pub(crate) fn advance_block(&mut self, fat: &AllocationTable) -> bool {
        match fat.next(self.block) {
            Some(next) => {
                self.block = next;
                self.local = 0;
                true
            }
            None => false,
        }
    }

    /// Visits up to `count` bytes as contiguous segments.
    ///
    /// `visit` receives the block, the byte range inside that block and the
    /// matching range of the caller's buffer. Returns the number of bytes
    /// visited, which is short when the chain ends first.
    pub(crate) fn walk<F>(mut self, fat: &AllocationTable, count: usize, mut visit: F) -> usize
    where
        F: FnMut(BlockId, Range<usize>, Range<usize>),
    {
        let mut done = 0;
        while done < count {
            if !self.has_more_in_block() && !self.advance_block(fat) {
                break;
            }
            let len = self.remaining_in_block().min(count - done);
            visit(self.block, self.local..self.local + len, done..done + len);
            self.local += len;
            done += len;
        }
        done
    }
}
