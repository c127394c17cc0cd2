//! Util Module - Shared Utilities
//!
//! Utilities and constants used throughout FSTM.

pub mod alignment;

pub use alignment::Alignment;

/// Constants for FSTM
pub mod constants {
    /// Machine word: the unit of conflict detection and versioning
    pub type Word = usize;

    /// Word size in bytes (pointer width)
    pub const WORD_SIZE: usize = core::mem::size_of::<Word>();

    /// Largest value a single typed barrier moves (complex long double, 256-bit vectors)
    pub const MAX_ACCESS_BYTES: usize = 32;

    /// Words in a scratch buffer: the largest access plus one straddled word
    pub const MAX_PLAN_WORDS: usize = MAX_ACCESS_BYTES / WORD_SIZE + 1;

    /// Stack buffer size used by bulk barriers per round trip
    pub const BULK_CHUNK_BYTES: usize = 256;

    /// Default write set capacity (entries)
    pub const DEFAULT_WRITE_SET_CAPACITY: usize = 64;

    /// Upper bound accepted for a configured write set capacity
    pub const MAX_WRITE_SET_CAPACITY: usize = 1 << 20;
}
