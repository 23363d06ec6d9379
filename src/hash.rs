//! The three-hash family used to identify entries.
//!
//! An entry is identified by three independent 32-bit hashes of its
//! normalized name. The index never stores names, so a false match requires
//! all three hashes to collide at once.

use std::fmt;

/// The three hashes of one normalized name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HashTriple {
    pub a: u32,
    pub b: u32,
    pub c: u32,
}

impl HashTriple {
    /// All-zero triples mark empty index slots.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.a == 0 && self.b == 0 && self.c == 0
    }
}

/// Source of the three hashes. Implementations must be pure and deterministic;
/// a package can only be read back with the oracle that wrote it.
pub trait HashOracle: fmt::Debug + Send + Sync {
    /// Primary hash; picks the home slot in the index.
    fn hash_a(&self, name: &[u8]) -> u32;
    fn hash_b(&self, name: &[u8]) -> u32;
    fn hash_c(&self, name: &[u8]) -> u32;

    fn triple(&self, name: &str) -> HashTriple {
        let bytes = name.as_bytes();
        HashTriple {
            a: self.hash_a(bytes),
            b: self.hash_b(bytes),
            c: self.hash_c(bytes),
        }
    }
}

/// CRC-32, the PHP/ELF shift-xor hash and BKDR (seed 131).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHashes;

impl HashOracle for StandardHashes {
    fn hash_a(&self, name: &[u8]) -> u32 {
        crc32fast::hash(name)
    }

    fn hash_b(&self, name: &[u8]) -> u32 {
        let mut h: u32 = 0;
        for &byte in name {
            h = (h << 4).wrapping_add(byte as u32);
            let g = h & 0xF000_0000;
            if g != 0 {
                h ^= g >> 24;
                h ^= g;
            }
        }
        h
    }

    fn hash_c(&self, name: &[u8]) -> u32 {
        const SEED: u32 = 131;
        let h = name
            .iter()
            .fold(0u32, |h, &byte| h.wrapping_mul(SEED).wrapping_add(byte as u32));
        h & 0x7FFF_FFFF
    }
}
