use thiserror::Error;

#[derive(Error, Debug)]
pub enum FatStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Insufficient space for {name}: {requested} bytes requested, {available} available")]
    InsufficientSpace {
        name: String,
        requested: usize,
        available: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FatStoreError {
    fn from(err: serde_json::Error) -> Self {
        FatStoreError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FatStoreError>;
