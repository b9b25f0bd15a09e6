mod block;
mod cursor;
mod directory;
mod engine;
mod fat;
pub mod image;

pub use block::{blocks_needed, BlockId, BlockStore, Geometry};
pub use directory::{DirEntry, Directory, EntryStatus, Fd, MAX_NAME_LEN};
pub use engine::FileStore;
pub use fat::{AllocationTable, Chain, FatEntry};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub block_size: usize,
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub files: usize,
    pub bytes_stored: usize,
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file descriptor: {0}")]
    InvalidDescriptor(Fd),

    #[error("File descriptor {0} is not open")]
    NotOpen(Fd),

    #[error("File descriptor {0} is open")]
    FileOpen(Fd),

    #[error("File descriptor {0} is unused")]
    FileUnused(Fd),

    #[error("Directory is full")]
    DirectoryFull,

    #[error("File name too long: {0}")]
    NameTooLong(String),

    #[error("File already exists: {0}")]
    NameExists(String),

    #[error("Seek to {offset} past end of descriptor {fd} (size {size})")]
    SeekOutOfRange { fd: Fd, offset: usize, size: usize },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
