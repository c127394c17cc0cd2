//! Write Set - Redo Log for Lazy Versioning
//!
//! A lazy transaction keeps its writes out of shared memory until commit.
//! The write set maps each written word to the value the transaction wants
//! there and the mask of bytes it actually wrote. Entries stay in insertion
//! order so writeback replays stores in program order.

use crate::barrier::mask::ByteMask;
use crate::config::StmConfig;
use crate::util::constants::{Word, DEFAULT_WRITE_SET_CAPACITY, WORD_SIZE};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::ptr;

/// One buffered word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSetEntry {
    pub addr: *mut Word,
    pub value: Word,
    pub mask: ByteMask,
}

impl WriteSetEntry {
    pub fn new(addr: *mut Word, value: Word, mask: ByteMask) -> Self {
        WriteSetEntry { addr, value, mask }
    }

    /// Fold a later write into this entry
    ///
    /// Bytes under `mask` take `value`; the masks union.
    #[inline]
    pub fn merge(&mut self, value: Word, mask: ByteMask) {
        self.value = mask.select(value, self.value);
        self.mask = self.mask.union(mask);
    }

    /// Store the masked bytes to memory
    ///
    /// # Safety
    ///
    /// `addr` must be word aligned and valid for writes of every masked byte.
    pub unsafe fn writeback(&self) {
        if self.mask.is_full() {
            ptr::write(self.addr, self.value);
            return;
        }

        let bytes = self.value.to_ne_bytes();
        let dst = self.addr.cast::<u8>();
        for (k, byte) in bytes.iter().enumerate().take(WORD_SIZE) {
            if self.mask.contains_byte(k) {
                ptr::write(dst.add(k), *byte);
            }
        }
    }
}

/// Insertion-ordered redo log keyed by word address
#[derive(Debug, Clone)]
pub struct WriteSet {
    entries: IndexMap<usize, WriteSetEntry, FxBuildHasher>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WRITE_SET_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WriteSet {
            entries: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    /// Write set sized for `config.write_set_capacity`
    pub fn from_config(config: &StmConfig) -> Self {
        Self::with_capacity(config.write_set_capacity)
    }

    /// Buffer the masked bytes of `value` for `addr`
    ///
    /// Returns true when the word was not in the set yet.
    pub fn insert(&mut self, addr: *mut Word, value: Word, mask: ByteMask) -> bool {
        debug_assert_eq!(addr as usize % WORD_SIZE, 0, "unaligned write set key");

        match self.entries.get_mut(&(addr as usize)) {
            Some(entry) => {
                entry.merge(value, mask);
                false
            }
            None => {
                let value = mask.select(value, 0);
                self.entries
                    .insert(addr as usize, WriteSetEntry::new(addr, value, mask));
                true
            }
        }
    }

    /// Buffered entry for `addr`, if any
    #[inline]
    pub fn find(&self, addr: *const Word) -> Option<&WriteSetEntry> {
        self.entries.get(&(addr as usize))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries the set holds before it reallocates
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &WriteSetEntry> {
        self.entries.values()
    }

    /// Drop every entry, keeping the allocation
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Store every entry to memory in insertion order
    ///
    /// Bytes outside an entry's mask are never written.
    ///
    /// # Safety
    ///
    /// Every buffered address must still be valid for writes.
    pub unsafe fn writeback(&self) {
        for entry in self.entries.values() {
            entry.writeback();
        }
        log::trace!("write set: wrote back {} words", self.entries.len());
    }
}

impl Default for WriteSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::mask::make_mask;

    fn splat(byte: u8) -> Word {
        Word::from_ne_bytes([byte; WORD_SIZE])
    }

    #[test]
    fn test_from_config_reserves_capacity() {
        let config = StmConfig {
            write_set_capacity: 1024,
            ..StmConfig::lazy()
        };
        let set = WriteSet::from_config(&config);
        assert!(set.is_empty());
        assert!(set.capacity() >= 1024);
        assert!(WriteSet::new().capacity() >= DEFAULT_WRITE_SET_CAPACITY);
    }

    #[test]
    fn test_insert_and_find() {
        let mut words = [0 as Word; 2];
        let addr = words.as_mut_ptr();
        let mut set = WriteSet::new();

        assert!(set.is_empty());
        assert!(set.insert(addr, splat(0x11), ByteMask::FULL));
        assert_eq!(set.len(), 1);

        let entry = set.find(addr).unwrap();
        assert_eq!(entry.value, splat(0x11));
        assert!(entry.mask.is_full());
        assert!(set.find(addr.wrapping_add(1)).is_none());
    }

    #[test]
    fn test_later_write_wins_and_masks_union() {
        let mut word: Word = 0;
        let addr = &mut word as *mut Word;
        let mut set = WriteSet::new();

        set.insert(addr, splat(0xAA), make_mask(0, 2));
        assert!(!set.insert(addr, splat(0xBB), make_mask(1, 3)));

        let entry = set.find(addr).unwrap();
        assert_eq!(entry.mask, make_mask(0, 3));
        let bytes = entry.value.to_ne_bytes();
        assert_eq!(&bytes[..3], &[0xAA, 0xBB, 0xBB]);
    }

    #[test]
    fn test_writeback_leaves_unmasked_bytes() {
        let mut words = [splat(0x55); 2];
        let base = words.as_mut_ptr();
        let mut set = WriteSet::new();

        set.insert(base, splat(0x01), make_mask(2, 4));
        set.insert(base.wrapping_add(1), splat(0x02), ByteMask::FULL);
        unsafe { set.writeback() };

        let first = words[0].to_ne_bytes();
        for (k, byte) in first.iter().enumerate() {
            let expected = if (2..4).contains(&k) { 0x01 } else { 0x55 };
            assert_eq!(*byte, expected, "byte {}", k);
        }
        assert_eq!(words[1], splat(0x02));
    }

    #[test]
    fn test_insertion_order_and_reset() {
        let mut words = [0 as Word; 4];
        let base = words.as_mut_ptr();
        let mut set = WriteSet::with_capacity(2);

        for i in [3usize, 0, 2] {
            set.insert(base.wrapping_add(i), i as Word, ByteMask::FULL);
        }
        let order: Vec<Word> = set.iter().map(|e| e.value).collect();
        assert_eq!(order, vec![3, 0, 2]);

        set.reset();
        assert!(set.is_empty());
    }
}
