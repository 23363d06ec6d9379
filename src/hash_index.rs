//! Open-addressing index from hash triples to entry indices.
//!
//! The index has exactly one slot per entry. Each entry is placed by linear
//! probing from `hash_a % n`; lookups walk the same sequence and stop at the
//! first slot whose full triple matches. Because the table has no slack, a
//! build either places every entry or fails.
//!
//! An empty slot is an all-zero triple. An entry whose three hashes are all
//! zero therefore looks empty to later placements and may be overwritten;
//! packages written by other tools rely on this exact behavior, so it is kept.

use crate::error::{PackageError, Result};
use crate::hash::HashTriple;
use crate::table::EntryTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashSlot {
    pub hashes: HashTriple,
    pub entry:  usize,
}

impl HashSlot {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_zero()
    }
}

#[derive(Debug, Default, Clone)]
pub struct HashIndex {
    slots: Vec<HashSlot>,
}

impl HashIndex {
    pub fn build(table: &EntryTable) -> Result<Self> {
        let hashes: Vec<HashTriple> = table.iter().map(|e| e.hashes).collect();
        Self::from_hashes(&hashes)
    }

    /// Build from triples in entry-index order.
    pub fn from_hashes(hashes: &[HashTriple]) -> Result<Self> {
        let count = hashes.len();
        let mut slots = Vec::new();
        slots.try_reserve_exact(count)?;
        slots.resize(count, HashSlot::default());

        for (entry, triple) in hashes.iter().enumerate() {
            let home = home_slot(triple.a, count);
            let free = (0..count)
                .map(|step| (home + step) % count)
                .find(|&i| slots[i].is_empty());
            match free {
                Some(i) => slots[i] = HashSlot { hashes: *triple, entry },
                None => return Err(PackageError::IndexBuildFailed { entry, count }),
            }
        }
        Ok(Self { slots })
    }

    pub fn lookup(&self, hashes: &HashTriple) -> Option<usize> {
        let count = self.slots.len();
        if count == 0 {
            return None;
        }
        let home = home_slot(hashes.a, count);
        (0..count)
            .map(|step| &self.slots[(home + step) % count])
            .find(|slot| slot.hashes == *hashes)
            .map(|slot| slot.entry)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[HashSlot] {
        &self.slots
    }
}

#[inline]
fn home_slot(hash_a: u32, count: usize) -> usize {
    (hash_a as u64 % count as u64) as usize
}
