use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::{FatStoreError, Result};
use storage::{blocks_needed, image, FileStore, StoreStats};

/// A store image bound to its configuration: the unit the CLI works on.
pub struct Volume {
    config: Config,
    store: FileStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: usize,
    pub blocks: usize,
}

impl Volume {
    /// Creates an empty store shaped by `config`. Nothing is written to disk
    /// until `save`.
    pub fn format(config: Config) -> Result<Self> {
        let geometry = config.geometry()?;
        info!(
            "Formatting volume {:?} ({} bytes)",
            config.image_path,
            config.capacity_bytes()
        );
        Ok(Self {
            store: FileStore::format(geometry),
            config,
        })
    }

    /// Loads the image named by `config`. The image's own geometry wins over
    /// the configured one.
    pub fn open(config: Config) -> Result<Self> {
        let store = image::load(&config.image_path)?;
        Ok(Self { config, store })
    }

    pub fn save(&self) -> Result<()> {
        image::save(&self.store, &self.config.image_path)?;
        Ok(())
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stores `data` under `name`, replacing any existing file of that name.
    ///
    /// Data that cannot fit, even counting the blocks of the file it
    /// replaces, is rejected as `InsufficientSpace` before anything changes.
    pub fn put(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        let block_size = self.store.block_size();
        let existing = self.store.lookup(name);
        let reclaimable = match existing {
            Some(fd) => self.store.block_count(fd)?,
            None => 0,
        };
        let available = (self.store.fat().free_count() + reclaimable) * block_size;
        if blocks_needed(data.len(), block_size) * block_size > available {
            return Err(FatStoreError::InsufficientSpace {
                name: name.to_string(),
                requested: data.len(),
                available,
            });
        }

        if let Some(existing) = existing {
            self.store.delete(existing)?;
        }

        let fd = self.store.create(name)?;
        self.store.open(fd)?;
        let written = self.store.write(fd, data);
        self.store.close(fd)?;

        if written < data.len() {
            self.store.delete(fd)?;
            return Err(FatStoreError::InsufficientSpace {
                name: name.to_string(),
                requested: data.len(),
                available: written,
            });
        }

        info!("Stored {} ({} bytes)", name, written);
        Ok(written)
    }

    pub fn get(&mut self, name: &str) -> Result<Vec<u8>> {
        let fd = self
            .store
            .lookup(name)
            .ok_or_else(|| FatStoreError::FileNotFound(name.to_string()))?;

        let size = self.store.size(fd)?;
        self.store.open(fd)?;
        let data = self.store.read_to_vec(fd, size);
        self.store.close(fd)?;
        Ok(data)
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let fd = self
            .store
            .lookup(name)
            .ok_or_else(|| FatStoreError::FileNotFound(name.to_string()))?;
        self.store.delete(fd)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<FileInfo> {
        let block_size = self.store.block_size();
        self.store
            .files()
            .map(|(_, entry)| FileInfo {
                name: entry.name().to_string(),
                size: entry.size(),
                blocks: entry.block_count(block_size),
            })
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}
