//! Transactional Value Types
//!
//! A barrier moves values as raw bytes through a scratch buffer, so every
//! type it handles must be plain data: `Copy`, free of padding, and valid
//! for any bit pattern. [`Transactional`] is the marker for that contract.
//!
//! Besides the primitive integers and floats this module provides the
//! types the instrumentation ABI expects and Rust lacks: an opaque x87
//! extended-precision float, complex pairs, fixed-width SIMD words, and
//! [`Packed`] for values reached through unaligned addresses.

use crate::util::constants::{MAX_ACCESS_BYTES, WORD_SIZE};
use std::mem::{align_of, size_of};

/// Plain-data value that can be split into words and reassembled
///
/// # Safety
///
/// Implementors must be `Copy`, contain no padding bytes, and accept every
/// bit pattern as a valid value. Their size must be non-zero and at most
/// `MAX_ACCESS_BYTES`; both bounds are checked when a barrier is first
/// instantiated for the type.
pub unsafe trait Transactional: Copy + 'static {
    /// Whether the type's natural alignment guarantees that an access never
    /// starts inside a word when the type is word sized or larger
    ///
    /// Sub-word types are still checked for word overflow at runtime.
    const ASSUMED_ALIGNED: bool = natural_alignment_covers::<Self>();
}

/// True when `align_of::<T>()` is at least `min(size_of::<T>(), WORD_SIZE)`
pub const fn natural_alignment_covers<T>() -> bool {
    let size = size_of::<T>();
    let needed = if size < WORD_SIZE { size } else { WORD_SIZE };
    align_of::<T>() >= needed
}

macro_rules! transactional {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Transactional for $ty {}
            static_assertions::const_assert!(size_of::<$ty>() <= MAX_ACCESS_BYTES);
        )*
    };
}

transactional!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Extended-precision float in its in-memory form
///
/// Holds the 80-bit x87 encoding in the low ten bytes, padded to the
/// sixteen bytes `long double` occupies on 64-bit targets. The barrier
/// layer never interprets the value; it only moves the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C, align(16))]
pub struct LongDouble {
    bytes: [u8; 16],
}

impl LongDouble {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        LongDouble { bytes }
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.bytes
    }

    /// Build from the 80-bit encoding held in the low bits of `bits`
    pub const fn from_bits(bits: u128) -> Self {
        LongDouble {
            bytes: (bits & ((1u128 << 80) - 1)).to_le_bytes(),
        }
    }

    pub const fn to_bits(self) -> u128 {
        u128::from_le_bytes(self.bytes) & ((1u128 << 80) - 1)
    }
}

/// Complex number laid out as `{ re, im }`, matching C `_Complex`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Complex { re, im }
    }
}

/// 64-bit SIMD word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C, align(8))]
pub struct V64(pub [u8; 8]);

/// 128-bit SIMD word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C, align(16))]
pub struct V128(pub [u8; 16]);

/// 256-bit SIMD word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C, align(32))]
pub struct V256(pub [u8; 32]);

transactional!(
    LongDouble,
    Complex<f32>,
    Complex<f64>,
    Complex<LongDouble>,
    V64,
    V128,
    V256,
);

#[cfg(target_arch = "x86_64")]
mod native {
    use super::Transactional;
    use std::arch::x86_64::{__m128, __m128d, __m128i};

    unsafe impl Transactional for __m128 {}
    unsafe impl Transactional for __m128d {}
    unsafe impl Transactional for __m128i {}

    #[cfg(target_feature = "avx")]
    mod avx {
        use super::Transactional;
        use std::arch::x86_64::{__m256, __m256d, __m256i};

        unsafe impl Transactional for __m256 {}
        unsafe impl Transactional for __m256d {}
        unsafe impl Transactional for __m256i {}
    }
}

/// Value stored at an address with no alignment guarantee
///
/// `Packed<T>` has the size of `T` and alignment 1, so the barrier always
/// checks the real address. Use it for fields of packed structures and for
/// byte-buffer deserialization.
#[repr(C, packed)]
pub struct Packed<T: Copy>(pub T);

impl<T: Copy> Packed<T> {
    pub const fn new(value: T) -> Self {
        Packed(value)
    }

    /// Copy the value out
    pub fn get(self) -> T {
        self.0
    }
}

impl<T: Copy> Clone for Packed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Copy> Copy for Packed<T> {}

impl<T: Copy + PartialEq> PartialEq for Packed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for Packed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Packed").field(&self.get()).finish()
    }
}

unsafe impl<T: Transactional> Transactional for Packed<T> {
    const ASSUMED_ALIGNED: bool = false;
}
