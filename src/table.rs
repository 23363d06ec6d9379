use std::io::{self, Read, Write};

use crate::entry::{FileEntry, ENTRY_SIZE};
use crate::error::{PackageError, Result};
use crate::hash::HashTriple;

/// Starting capacity of a table created for a new package.
pub const INITIAL_TABLE_CAPACITY: usize = 10;

/// Ordered, append-only list of entries. An entry's position is its
/// permanent index.
#[derive(Debug, Default, Clone)]
pub struct EntryTable {
    entries: Vec<FileEntry>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(capacity)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Append `entry` and return its index. A full table doubles its capacity.
    pub fn append(&mut self, entry: FileEntry) -> Result<usize> {
        if self.entries.len() == self.entries.capacity() {
            let grow = self.entries.capacity().max(1);
            self.entries.try_reserve_exact(grow)?;
        }
        let index = self.entries.len();
        self.entries.push(entry);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Result<&FileEntry> {
        self.entries.get(index).ok_or(PackageError::OutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    /// Linear search for an exact hash triple.
    pub fn position(&self, hashes: &HashTriple) -> Option<usize> {
        self.entries.iter().position(|e| e.hashes == *hashes)
    }

    pub fn clear(&mut self) {
        self.entries = Vec::new();
    }

    /// Serialized byte length of the whole table.
    pub fn serialized_len(&self) -> usize {
        self.entries.len() * ENTRY_SIZE
    }

    pub fn write_all<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            entry.write(&mut writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.serialized_len());
        self.write_all(&mut buf)?;
        Ok(buf)
    }

    /// Replace the contents with `count` records decoded from `reader`.
    pub fn read_from<R: Read>(&mut self, mut reader: R, count: usize) -> Result<()> {
        self.clear();
        self.entries.try_reserve_exact(count)?;
        for _ in 0..count {
            let entry = FileEntry::read(&mut reader)?;
            self.entries.push(entry);
        }
        Ok(())
    }
}
