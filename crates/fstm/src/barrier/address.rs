//! Address Decomposition
//!
//! Splits a typed address into the word that holds its first byte, the
//! byte offset inside that word, and the number of further words the
//! access touches.
//!
//! Every (type, alignment assumption) pair resolves into one of four
//! shapes:
//!
//! ```text
//!   SubWordInline       [ .. T T .. ]                    one masked word
//!   SubWordOverflowing  [ .. .. T T ][ T T .. .. ]       two partial words
//!   AlignedMultiWord    [ T T T T ][ T T T T ]           full words
//!   UnalignedMultiWord  [ .. T T T ][ T T T T ][ T .. ]  partial, full.., partial
//! ```
//!
//! The shape is picked once per access from the static descriptor plus a
//! single check of the real pointer. A pointer that happens to be aligned
//! takes the aligned path even when its type carries no static guarantee.

use super::plan::{AccessPlan, Scratch};
use crate::types::Transactional;
use crate::util::constants::{Word, MAX_ACCESS_BYTES, WORD_SIZE};
use crate::util::Alignment;
use std::mem::size_of;

/// Word holding the first byte of `addr`
///
/// The result keeps the provenance of `addr`.
#[inline(always)]
pub fn base_of<T>(addr: *const T) -> *mut Word {
    let offset = Alignment::word_offset(addr as usize);
    addr.cast::<u8>().wrapping_sub(offset).cast::<Word>().cast_mut()
}

/// Byte offset of `addr` inside its word
///
/// Always 0 for a statically aligned type that is at least word sized.
#[inline(always)]
pub const fn offset_of(addr: usize, size: usize, aligned: bool) -> usize {
    if aligned && size >= WORD_SIZE {
        0
    } else {
        Alignment::word_offset(addr)
    }
}

/// Number of words past the first needed to cover `size` bytes starting at
/// `offset`
///
/// A sub-word access needs a second word only when `offset + size`
/// overflows the word; this is decided from the real offset even for
/// aligned types. For a statically aligned multi-word type the plan
/// therefore holds exactly `size / WORD_SIZE` words.
#[inline(always)]
pub const fn word_count(size: usize, aligned: bool, offset: usize) -> usize {
    let offset = if aligned && size >= WORD_SIZE { 0 } else { offset };
    (offset + size - 1) / WORD_SIZE
}

/// TypeAccessDescriptor - static access metadata for one type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAccessDescriptor {
    /// Element size in bytes
    pub size: usize,
    /// Whether the type never starts inside a word (word sized and up)
    pub assumed_aligned: bool,
    /// Words an access at offset 0 spans
    pub words: usize,
}

impl TypeAccessDescriptor {
    /// # Panics
    ///
    /// Panics if `size` is zero or larger than `MAX_ACCESS_BYTES`.
    pub const fn new(size: usize, assumed_aligned: bool) -> Self {
        assert!(
            size > 0 && size <= MAX_ACCESS_BYTES,
            "access size out of range"
        );
        TypeAccessDescriptor {
            size,
            assumed_aligned,
            words: Alignment::words_for(size),
        }
    }

    /// Descriptor for `T` under its natural alignment assumption
    ///
    /// Built at compile time: a zero-sized or oversized `T` fails to
    /// build instead of producing a bad word plan.
    ///
    /// ```compile_fail
    /// use fstm::barrier::TypeAccessDescriptor;
    /// use fstm::types::Transactional;
    ///
    /// #[derive(Clone, Copy)]
    /// struct Empty;
    /// unsafe impl Transactional for Empty {}
    ///
    /// let _ = TypeAccessDescriptor::of::<Empty>();
    /// ```
    ///
    /// ```compile_fail
    /// use fstm::barrier::TypeAccessDescriptor;
    /// use fstm::types::Transactional;
    ///
    /// #[derive(Clone, Copy)]
    /// struct Wide([u64; 5]);
    /// unsafe impl Transactional for Wide {}
    ///
    /// let _ = TypeAccessDescriptor::of::<Wide>();
    /// ```
    #[inline(always)]
    pub const fn of<T: Transactional>() -> Self {
        const { Self::new(size_of::<T>(), T::ASSUMED_ALIGNED) }
    }

    /// Same descriptor with the alignment assumption forced on
    pub const fn forced_aligned(self) -> Self {
        TypeAccessDescriptor {
            assumed_aligned: true,
            ..self
        }
    }

    #[inline(always)]
    pub const fn is_sub_word(&self) -> bool {
        self.size < WORD_SIZE
    }
}

/// AccessShape - the four ways a typed access maps onto words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessShape {
    /// Sub-word value entirely inside one word
    SubWordInline { offset: usize },
    /// Sub-word value crossing into the next word
    SubWordOverflowing { offset: usize },
    /// Word-aligned value of one or more words
    AlignedMultiWord { words: usize },
    /// Word sized or larger value starting inside a word
    UnalignedMultiWord { offset: usize, words: usize },
}

impl AccessShape {
    /// Pick the cheapest shape for an access at `addr`
    #[inline]
    pub fn resolve(desc: &TypeAccessDescriptor, addr: usize) -> Self {
        let real = Alignment::word_offset(addr);

        if desc.is_sub_word() {
            let offset = offset_of(addr, desc.size, desc.assumed_aligned);
            if offset + desc.size <= WORD_SIZE {
                AccessShape::SubWordInline { offset }
            } else {
                AccessShape::SubWordOverflowing { offset }
            }
        } else if desc.assumed_aligned || real == 0 {
            debug_assert!(
                real == 0,
                "statically aligned access at unaligned address {:#x}",
                addr
            );
            AccessShape::AlignedMultiWord { words: desc.words }
        } else {
            AccessShape::UnalignedMultiWord {
                offset: real,
                words: 1 + word_count(desc.size, false, real),
            }
        }
    }

    /// Byte offset of the value inside the first word
    #[inline(always)]
    pub const fn offset(&self) -> usize {
        match *self {
            AccessShape::SubWordInline { offset }
            | AccessShape::SubWordOverflowing { offset }
            | AccessShape::UnalignedMultiWord { offset, .. } => offset,
            AccessShape::AlignedMultiWord { .. } => 0,
        }
    }

    /// Total words in the plan
    #[inline(always)]
    pub const fn words(&self) -> usize {
        match *self {
            AccessShape::SubWordInline { .. } => 1,
            AccessShape::SubWordOverflowing { .. } => 2,
            AccessShape::AlignedMultiWord { words } | AccessShape::UnalignedMultiWord { words, .. } => {
                words
            }
        }
    }

    /// Whether the access straddles a word boundary it does not start on
    #[inline(always)]
    pub const fn is_unaligned(&self) -> bool {
        matches!(
            self,
            AccessShape::SubWordOverflowing { .. } | AccessShape::UnalignedMultiWord { .. }
        )
    }
}

/// Decomposition - plan, assemble and disassemble a typed access
pub trait Decomposition {
    /// Word addresses and masks for `size` bytes whose first word is `base`
    fn plan(&self, base: *mut Word, size: usize) -> AccessPlan;

    /// Extract the typed value from a filled scratch buffer
    fn assemble<T: Transactional>(&self, scratch: &Scratch) -> T;

    /// Lay a typed value out in a zeroed scratch buffer
    fn disassemble<T: Transactional>(&self, value: T) -> Scratch;
}

impl Decomposition for AccessShape {
    #[inline]
    fn plan(&self, base: *mut Word, size: usize) -> AccessPlan {
        // An aligned type of `WORD_SIZE + k` bytes is the unaligned path at
        // offset 0: the first and middle masks come out full on their own.
        let plan = AccessPlan::new(base, self.offset(), size);
        debug_assert_eq!(plan.len(), self.words());
        plan
    }

    #[inline]
    fn assemble<T: Transactional>(&self, scratch: &Scratch) -> T {
        scratch.extract::<T>(self.offset())
    }

    #[inline]
    fn disassemble<T: Transactional>(&self, value: T) -> Scratch {
        let mut scratch = Scratch::zeroed();
        scratch.place(self.offset(), value);
        scratch
    }
}
