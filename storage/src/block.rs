use serde::{Deserialize, Serialize};

use crate::{Result, StorageError};

pub type BlockId = usize;

/// Shape of a store: fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub block_size: usize,
    pub block_count: usize,
    pub max_files: usize,
}

impl Geometry {
    pub fn new(block_size: usize, block_count: usize, max_files: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(StorageError::InvalidGeometry("block size must be non-zero".to_string()));
        }
        if block_count == 0 {
            return Err(StorageError::InvalidGeometry("block count must be non-zero".to_string()));
        }
        if max_files == 0 {
            return Err(StorageError::InvalidGeometry("directory must hold at least one file".to_string()));
        }
        if block_size.checked_mul(block_count).is_none() {
            return Err(StorageError::InvalidGeometry(format!(
                "{} blocks of {} bytes overflow the addressable size",
                block_count, block_size
            )));
        }

        Ok(Self {
            block_size,
            block_count,
            max_files,
        })
    }

    pub fn capacity_bytes(&self) -> usize {
        self.block_size * self.block_count
    }
}

/// Number of blocks needed to hold `size` bytes.
pub fn blocks_needed(size: usize, block_size: usize) -> usize {
    size.div_ceil(block_size)
}

/// Flat byte arena addressed as `block_count` blocks of `block_size` bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStore {
    block_size: usize,
    data: Vec<u8>,
}

impl BlockStore {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            block_size: geometry.block_size,
            data: vec![0; geometry.capacity_bytes()],
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.data.len() / self.block_size
    }

    pub fn block(&self, id: BlockId) -> &[u8] {
        let start = id * self.block_size;
        &self.data[start..start + self.block_size]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut [u8] {
        let start = id * self.block_size;
        &mut self.data[start..start + self.block_size]
    }

    pub fn zero(&mut self, id: BlockId) {
        self.block_mut(id).fill(0);
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.data.len()
    }
}
