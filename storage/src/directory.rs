use serde::{Deserialize, Serialize};

use crate::block::{blocks_needed, BlockId};
use crate::{Result, StorageError};

pub type Fd = usize;

pub const MAX_NAME_LEN: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[default]
    Unused,
    Closed,
    Open,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub(crate) status: EntryStatus,
    pub(crate) name: String,
    pub(crate) first_block: Option<BlockId>,
    pub(crate) size: usize,
    pub(crate) cursor: usize,
}

impl DirEntry {
    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn first_block(&self) -> Option<BlockId> {
        self.first_block
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_unused(&self) -> bool {
        self.status == EntryStatus::Unused
    }

    /// Blocks logically needed to hold `size` bytes.
    pub fn block_count(&self, block_size: usize) -> usize {
        blocks_needed(self.size, block_size)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Fixed-size table of file entries indexed by descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    entries: Vec<DirEntry>,
}

impl Directory {
    pub fn new(max_files: usize) -> Self {
        Self {
            entries: vec![DirEntry::default(); max_files],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn check_fd(&self, fd: Fd) -> bool {
        fd < self.entries.len()
    }

    fn guard(&self, fd: Fd) -> Result<Fd> {
        if self.check_fd(fd) {
            Ok(fd)
        } else {
            Err(StorageError::InvalidDescriptor(fd))
        }
    }

    pub fn entry(&self, fd: Fd) -> Result<&DirEntry> {
        let fd = self.guard(fd)?;
        Ok(&self.entries[fd])
    }

    pub(crate) fn entry_mut(&mut self, fd: Fd) -> Result<&mut DirEntry> {
        let fd = self.guard(fd)?;
        Ok(&mut self.entries[fd])
    }

    /// Entry for an in-range descriptor that is not Unused.
    pub fn active(&self, fd: Fd) -> Result<&DirEntry> {
        match self.entry(fd)? {
            entry if entry.is_unused() => Err(StorageError::InvalidDescriptor(fd)),
            entry => Ok(entry),
        }
    }

    pub(crate) fn open_entry_mut(&mut self, fd: Fd) -> Result<&mut DirEntry> {
        let entry = self.entry_mut(fd)?;
        if entry.status != EntryStatus::Open {
            return Err(StorageError::NotOpen(fd));
        }
        Ok(entry)
    }

    pub fn lookup(&self, name: &str) -> Option<Fd> {
        self.entries
            .iter()
            .position(|entry| !entry.is_unused() && entry.name == name)
    }

    pub(crate) fn create(&mut self, name: &str) -> Result<Fd> {
        if name.len() > MAX_NAME_LEN {
            return Err(StorageError::NameTooLong(name.to_string()));
        }
        if self.lookup(name).is_some() {
            return Err(StorageError::NameExists(name.to_string()));
        }

        let fd = self
            .entries
            .iter()
            .position(DirEntry::is_unused)
            .ok_or(StorageError::DirectoryFull)?;

        self.entries[fd] = DirEntry {
            status: EntryStatus::Closed,
            name: name.to_string(),
            ..DirEntry::default()
        };
        Ok(fd)
    }

    pub(crate) fn open(&mut self, fd: Fd) -> Result<()> {
        let entry = self.entry_mut(fd)?;
        match entry.status {
            EntryStatus::Unused => Err(StorageError::FileUnused(fd)),
            EntryStatus::Open => Ok(()),
            EntryStatus::Closed => {
                entry.status = EntryStatus::Open;
                entry.cursor = 0;
                Ok(())
            }
        }
    }

    pub(crate) fn close(&mut self, fd: Fd) -> Result<()> {
        let entry = self.entry_mut(fd)?;
        if entry.status != EntryStatus::Open {
            return Err(StorageError::NotOpen(fd));
        }
        entry.status = EntryStatus::Closed;
        Ok(())
    }

    pub(crate) fn close_all(&mut self) {
        for entry in &mut self.entries {
            if entry.status == EntryStatus::Open {
                entry.status = EntryStatus::Closed;
                entry.cursor = 0;
            }
        }
    }

    pub fn iter_all(&self) -> impl Iterator<Item = (Fd, &DirEntry)> {
        self.entries.iter().enumerate()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (Fd, &DirEntry)> {
        self.iter_all().filter(|(_, entry)| !entry.is_unused())
    }
}
