pub mod config;
pub mod error;
pub mod volume;

pub use config::Config;
pub use error::{FatStoreError, Result};
pub use volume::{FileInfo, Volume};

// Re-export the engine crate
pub use storage;
