//! Alignment Utilities
//!
//! Helper functions for word alignment of raw addresses.

use super::constants::WORD_SIZE;

/// Alignment - utility for alignment operations
pub struct Alignment;

impl Alignment {
    /// Byte offset of `value` past the previous boundary
    ///
    /// # Examples
    /// ```
    /// use fstm::util::Alignment;
    ///
    /// assert_eq!(Alignment::offset_in(100, 8), 4);
    /// assert_eq!(Alignment::offset_in(64, 8), 0);
    /// ```
    #[inline(always)]
    pub const fn offset_in(value: usize, alignment: usize) -> usize {
        value & (alignment - 1)
    }

    /// Byte offset of an address inside its containing word
    #[inline(always)]
    pub const fn word_offset(address: usize) -> usize {
        Self::offset_in(address, WORD_SIZE)
    }

    /// Number of words needed to hold `bytes` bytes
    #[inline(always)]
    pub const fn words_for(bytes: usize) -> usize {
        (bytes + WORD_SIZE - 1) / WORD_SIZE
    }

    /// Word alignment (pointer width)
    pub const WORD: usize = WORD_SIZE;
}
