//! Byte Masks
//!
//! Every transactional word access carries a mask naming the bytes of the
//! word that belong to the access. The engine only detects conflicts and
//! versions data on those bytes.
//!
//! Byte position `k` is memory byte `k` of the word. On little-endian
//! targets that is bit range `[8k, 8k + 8)` of the numeric word value; on
//! big-endian targets the numeric value is byte-swapped so the mask still
//! lines up with memory when the word is stored.

use crate::util::constants::{Word, WORD_SIZE};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// ByteMask - word-sized mask with full-byte granularity
///
/// Each byte is either `0x00` or `0xFF`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ByteMask(Word);

impl ByteMask {
    /// Every byte of the word
    pub const FULL: ByteMask = ByteMask(Word::MAX);

    /// No byte of the word; only produced by mask algebra
    pub const EMPTY: ByteMask = ByteMask(0);

    /// Mask covering byte range `[i, j)` of a word
    ///
    /// Requires `0 <= i < j <= WORD_SIZE`. When the bounds are constants the
    /// whole computation folds to a literal.
    #[inline(always)]
    pub const fn range(i: usize, j: usize) -> Self {
        debug_assert!(i < j && j <= WORD_SIZE, "mask range is incorrect");
        let mut bits = Word::MAX;
        bits >>= 8 * (WORD_SIZE - j + i); // shift 0s to the top
        bits <<= 8 * i; // shift 0s into the bottom
        ByteMask(Word::from_le(bits))
    }

    /// Raw mask bits as stored in memory order
    #[inline(always)]
    pub const fn bits(self) -> Word {
        self.0
    }

    /// Whether memory byte `k` of the word is covered
    #[inline]
    pub fn contains_byte(self, k: usize) -> bool {
        self.0.to_ne_bytes()[k] != 0
    }

    /// Number of covered bytes
    #[inline]
    pub const fn count_bytes(self) -> usize {
        (self.0.count_ones() / 8) as usize
    }

    #[inline(always)]
    pub const fn is_full(self) -> bool {
        self.0 == Word::MAX
    }

    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn union(self, other: ByteMask) -> ByteMask {
        ByteMask(self.0 | other.0)
    }

    #[inline(always)]
    pub const fn intersect(self, other: ByteMask) -> ByteMask {
        ByteMask(self.0 & other.0)
    }

    /// Bytes of `self` not covered by `other`
    #[inline(always)]
    pub const fn difference(self, other: ByteMask) -> ByteMask {
        ByteMask(self.0 & !other.0)
    }

    /// Whether every byte of `other` is also in `self`
    #[inline(always)]
    pub const fn covers(self, other: ByteMask) -> bool {
        other.0 & !self.0 == 0
    }

    /// Bytes of `new` under the mask, bytes of `old` elsewhere
    #[inline(always)]
    pub const fn select(self, new: Word, old: Word) -> Word {
        (new & self.0) | (old & !self.0)
    }
}

impl BitOr for ByteMask {
    type Output = ByteMask;

    fn bitor(self, rhs: ByteMask) -> ByteMask {
        self.union(rhs)
    }
}

impl BitAnd for ByteMask {
    type Output = ByteMask;

    fn bitand(self, rhs: ByteMask) -> ByteMask {
        self.intersect(rhs)
    }
}

impl fmt::Debug for ByteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteMask({:#0width$x})", self.0, width = 2 + 2 * WORD_SIZE)
    }
}

/// Mask covering byte range `[i, j)` of a word
///
/// Shorthand for [`ByteMask::range`].
#[inline(always)]
pub const fn make_mask(i: usize, j: usize) -> ByteMask {
    ByteMask::range(i, j)
}
