use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FatStoreError, Result};
use storage::Geometry;

pub const DEFAULT_BLOCK_SIZE: usize = 128;
pub const DEFAULT_BLOCK_COUNT: usize = 256;
pub const DEFAULT_MAX_FILES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub image_path: PathBuf,
    pub block_size: usize,
    pub block_count: usize,
    pub max_files: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("fatstore.img"),
            block_size: DEFAULT_BLOCK_SIZE,
            block_count: DEFAULT_BLOCK_COUNT,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl Config {
    pub fn new<P: Into<PathBuf>>(image_path: P) -> Self {
        Self {
            image_path: image_path.into(),
            ..Self::default()
        }
    }

    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_path.as_os_str().is_empty() {
            return Err(FatStoreError::InvalidConfig("image path is empty".to_string()));
        }
        self.geometry().map(|_| ())
    }

    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.block_size, self.block_count, self.max_files)
            .map_err(|e| FatStoreError::InvalidConfig(e.to_string()))
    }

    pub fn capacity_bytes(&self) -> usize {
        self.block_size.saturating_mul(self.block_count)
    }
}
