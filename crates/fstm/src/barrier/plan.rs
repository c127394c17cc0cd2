//! Access Plans and Scratch Buffers
//!
//! An [`AccessPlan`] lists the words a single typed access touches together
//! with the byte mask for each. A [`Scratch`] is the word-aligned staging
//! area the value is assembled in (reads) or laid out in (writes).
//!
//! [`ByteRangePlan`] is the unbounded counterpart used by the bulk
//! operations: it walks an arbitrary byte range one word at a time.

use super::mask::ByteMask;
use crate::types::Transactional;
use crate::util::constants::{Word, MAX_PLAN_WORDS, WORD_SIZE};
use std::mem::size_of;
use std::ptr;

/// Words and masks covering one typed access
///
/// The first mask starts at the in-word offset, the last one ends at the
/// final byte of the value, and every mask in between is full. Concatenating
/// the masked bytes in plan order gives exactly the bytes of the value.
#[derive(Clone, Copy)]
pub struct AccessPlan {
    base: *mut Word,
    masks: [ByteMask; MAX_PLAN_WORDS],
    len: usize,
}

impl AccessPlan {
    /// Plan `size` bytes starting `offset` bytes into the word at `base`
    #[inline]
    pub fn new(base: *mut Word, offset: usize, size: usize) -> Self {
        debug_assert!(offset < WORD_SIZE);
        debug_assert!(size > 0);

        let end = offset + size;
        let len = (end + WORD_SIZE - 1) / WORD_SIZE;
        debug_assert!(len <= MAX_PLAN_WORDS, "access too large: {} bytes", size);

        let mut masks = [ByteMask::EMPTY; MAX_PLAN_WORDS];
        for (i, mask) in masks.iter_mut().enumerate().take(len) {
            let lo = if i == 0 { offset } else { 0 };
            let hi = (end - i * WORD_SIZE).min(WORD_SIZE);
            *mask = ByteMask::range(lo, hi);
        }

        AccessPlan { base, masks, len }
    }

    /// First word of the plan
    #[inline(always)]
    pub fn base(&self) -> *mut Word {
        self.base
    }

    /// Number of words touched
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mask of word `i`
    #[inline(always)]
    pub fn mask(&self, i: usize) -> ByteMask {
        debug_assert!(i < self.len);
        self.masks[i]
    }

    /// Address of word `i`
    #[inline(always)]
    pub fn word(&self, i: usize) -> *mut Word {
        self.base.wrapping_add(i)
    }

    /// `(word address, mask)` pairs in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = (*mut Word, ByteMask)> + '_ {
        self.masks[..self.len]
            .iter()
            .enumerate()
            .map(move |(i, &mask)| (self.base.wrapping_add(i), mask))
    }
}

impl std::fmt::Debug for AccessPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPlan")
            .field("base", &self.base)
            .field("masks", &&self.masks[..self.len])
            .finish()
    }
}

/// Word-aligned staging buffer for one access
///
/// Large enough for the biggest supported value starting at the last byte
/// of a word.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Scratch {
    words: [Word; MAX_PLAN_WORDS],
}

impl Scratch {
    /// Capacity in bytes
    pub const BYTES: usize = MAX_PLAN_WORDS * WORD_SIZE;

    #[inline(always)]
    pub const fn zeroed() -> Self {
        Scratch {
            words: [0; MAX_PLAN_WORDS],
        }
    }

    #[inline(always)]
    pub fn word(&self, i: usize) -> Word {
        self.words[i]
    }

    #[inline(always)]
    pub fn set_word(&mut self, i: usize, value: Word) {
        self.words[i] = value;
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `Word` has no padding and any byte is a valid `u8`
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), Self::BYTES) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; every byte pattern is a valid `Word`
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), Self::BYTES) }
    }

    /// Read a `T` from byte `offset`
    #[inline(always)]
    pub fn extract<T: Transactional>(&self, offset: usize) -> T {
        assert!(offset + size_of::<T>() <= Self::BYTES);
        // SAFETY: bounds checked above; `Transactional` accepts any bit pattern
        unsafe { ptr::read_unaligned(self.words.as_ptr().cast::<u8>().add(offset).cast::<T>()) }
    }

    /// Write `value` at byte `offset`
    #[inline(always)]
    pub fn place<T: Transactional>(&mut self, offset: usize, value: T) {
        assert!(offset + size_of::<T>() <= Self::BYTES);
        // SAFETY: bounds checked above
        unsafe {
            ptr::write_unaligned(
                self.words.as_mut_ptr().cast::<u8>().add(offset).cast::<T>(),
                value,
            )
        }
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Scratch").field(&self.words).finish()
    }
}

/// One word of a [`ByteRangePlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeStep {
    /// Word containing the bytes
    pub word: *mut Word,
    /// Bytes of the word inside the range
    pub mask: ByteMask,
    /// First covered byte within the word
    pub offset: usize,
    /// Position of that byte relative to the start of the range
    pub start: usize,
    /// Covered bytes in this word
    pub len: usize,
}

/// Walks `[addr, addr + len)` one word at a time in ascending order
#[derive(Debug, Clone)]
pub struct ByteRangePlan {
    word: *mut Word,
    offset: usize,
    start: usize,
    remaining: usize,
}

impl ByteRangePlan {
    pub fn new(addr: *const u8, len: usize) -> Self {
        let offset = addr as usize % WORD_SIZE;
        ByteRangePlan {
            word: addr.wrapping_sub(offset).cast::<Word>().cast_mut(),
            offset,
            start: 0,
            remaining: len,
        }
    }

    /// Words the remaining range touches
    pub fn words(&self) -> usize {
        if self.remaining == 0 {
            0
        } else {
            (self.offset + self.remaining + WORD_SIZE - 1) / WORD_SIZE
        }
    }
}

impl Iterator for ByteRangePlan {
    type Item = RangeStep;

    fn next(&mut self) -> Option<RangeStep> {
        if self.remaining == 0 {
            return None;
        }

        let take = (WORD_SIZE - self.offset).min(self.remaining);
        let step = RangeStep {
            word: self.word,
            mask: ByteMask::range(self.offset, self.offset + take),
            offset: self.offset,
            start: self.start,
            len: take,
        };

        self.word = self.word.wrapping_add(1);
        self.offset = 0;
        self.start += take;
        self.remaining -= take;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.words();
        (n, Some(n))
    }
}

impl ExactSizeIterator for ByteRangePlan {}
