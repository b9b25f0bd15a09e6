//! On-disk image of a whole store.
//!
//! The image is a bincode envelope carrying a magic tag, a format version, a
//! blake3 checksum and the bincode-encoded store payload.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::{BlockStore, Geometry};
use crate::directory::Directory;
use crate::engine::FileStore;
use crate::fat::AllocationTable;
use crate::{Result, StorageError};

const IMAGE_MAGIC: [u8; 8] = *b"FATSTORE";
const IMAGE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 8],
    version: u32,
    checksum: String,
    payload: Vec<u8>,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    geometry: &'a Geometry,
    fat: &'a AllocationTable,
    directory: &'a Directory,
    blocks: &'a BlockStore,
}

#[derive(Deserialize)]
struct Payload {
    geometry: Geometry,
    fat: AllocationTable,
    directory: Directory,
    blocks: BlockStore,
}

pub fn to_bytes(store: &FileStore) -> Result<Vec<u8>> {
    let payload = bincode::serialize(&PayloadRef {
        geometry: store.geometry(),
        fat: store.fat(),
        directory: store.directory(),
        blocks: store.blocks(),
    })?;

    let envelope = Envelope {
        magic: IMAGE_MAGIC,
        version: IMAGE_VERSION,
        checksum: blake3::hash(&payload).to_hex().to_string(),
        payload,
    };
    Ok(bincode::serialize(&envelope)?)
}

/// Decodes and validates an image. Files that were open when the image was
/// taken come back closed with their cursor at 0.
pub fn from_bytes(bytes: &[u8]) -> Result<FileStore> {
    let envelope: Envelope = bincode::deserialize(bytes)?;
    if envelope.magic != IMAGE_MAGIC {
        return Err(StorageError::Corruption("not a fatstore image".to_string()));
    }
    if envelope.version != IMAGE_VERSION {
        return Err(StorageError::Corruption(format!(
            "unsupported image version {}",
            envelope.version
        )));
    }

    let checksum = blake3::hash(&envelope.payload).to_hex().to_string();
    if checksum != envelope.checksum {
        return Err(StorageError::Corruption("image checksum mismatch".to_string()));
    }

    let Payload {
        geometry,
        fat,
        mut directory,
        blocks,
    } = bincode::deserialize(&envelope.payload)?;

    let geometry = Geometry::new(geometry.block_size, geometry.block_count, geometry.max_files)?;
    if blocks.block_size() != geometry.block_size
        || blocks.byte_len() != geometry.capacity_bytes()
        || fat.len() != geometry.block_count
        || directory.len() != geometry.max_files
    {
        return Err(StorageError::Corruption(
            "image tables do not match its geometry".to_string(),
        ));
    }

    directory.close_all();
    let store = FileStore::from_parts(geometry, blocks, fat, directory);
    store.check_consistency()?;
    Ok(store)
}

pub fn save<P: AsRef<Path>>(store: &FileStore, path: P) -> Result<()> {
    let bytes = to_bytes(store)?;
    fs::write(path.as_ref(), bytes)?;
    tracing::info!("Saved store image to {:?}", path.as_ref());
    Ok(())
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<FileStore> {
    let bytes = fs::read(path.as_ref())?;
    let store = from_bytes(&bytes)?;
    tracing::info!("Loaded store image from {:?}", path.as_ref());
    Ok(store)
}
