//! # FSTM - Word-Granular Transactional Memory Barriers
//!
//! FSTM is the memory-access instrumentation core of a software
//! transactional memory runtime. It turns an ordinary typed load or store of
//! any size and alignment into the masked, word-aligned accesses a
//! transaction engine understands.
//!
//! ## Overview
//!
//! The engine behind the barriers only knows whole, aligned, pointer-sized
//! words plus a byte mask naming the live bytes of each word. FSTM bridges
//! three gaps between that model and real programs:
//!
//! - **Type width**: values narrower than, equal to, or wider than a word
//! - **Alignment**: values that start inside a word or straddle a boundary
//! - **Stack slots**: transaction-local temporaries skip conflict detection,
//!   and are undo-logged only when a nested scope may roll back over them
//!
//! ## Quick Start
//!
//! ```rust
//! use fstm::{ByteMask, EagerBarrier, StmConfig, TxEngine, Word};
//!
//! /// Engine that runs every word access directly against memory
//! struct Direct;
//!
//! impl TxEngine for Direct {
//!     unsafe fn tm_read(&mut self, addr: *const Word, _mask: ByteMask) -> fstm::Result<Word> {
//!         Ok(addr.read())
//!     }
//!
//!     unsafe fn tm_write(&mut self, addr: *mut Word, value: Word, mask: ByteMask) -> fstm::Result<()> {
//!         addr.write(mask.select(value, addr.read()));
//!         Ok(())
//!     }
//!
//!     unsafe fn log(&mut self, _addr: *const u8, _len: usize) -> fstm::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn inner_stack_high(&self) -> usize { 0 }
//!     fn outer_stack_high(&self) -> usize { 0 }
//! }
//!
//! fn main() -> fstm::Result<()> {
//!     let barrier = EagerBarrier::new(StmConfig::eager())?;
//!     let mut tx = Direct;
//!
//!     let mut words = vec![0 as Word; 2];
//!     let addr = words.as_mut_ptr().cast::<u16>();
//!
//!     unsafe {
//!         barrier.write_u2(&mut tx, addr, 0xBEEF)?;
//!         assert_eq!(barrier.read_u2(&mut tx, addr)?, 0xBEEF);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            Surface  read_u4 / write_d / memcpy           │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │
//! ┌────────────────────────────▼─────────────────────────────┐
//! │   Prefilter (stack)  ──in place──▶  plain load / store   │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ instrument
//! ┌────────────────────────────▼─────────────────────────────┐
//! │   Barrier: AccessShape → AccessPlan → Scratch buffer     │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ (word, mask)
//! ┌────────────────────────────▼─────────────────────────────┐
//! │   Word accessor: RAW lookup, read-only path, write sink  │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │
//!                         TxEngine / WriteSet
//! ```
//!
//! ### Access Shapes
//!
//! | Shape | Words | Masks |
//! |-------|-------|-------|
//! | Sub-word inline | 1 | `[offset, offset + size)` |
//! | Sub-word overflowing | 2 | `[offset, W)`, `[0, offset + size - W)` |
//! | Aligned multi-word | `size / W` | all full (last may be partial) |
//! | Unaligned multi-word | `size / W + 1` | partial, full.., partial |
//!
//! ### Versioning
//!
//! - [`EagerBarrier`]: writes go straight to `tm_write`; the engine keeps an
//!   undo log.
//! - [`LazyBarrier`]: writes are buffered in the transaction's [`WriteSet`];
//!   reads forward from it, and a transaction with an empty write set reads
//!   through `tm_read_ro`.
//!
//! ## Safety
//!
//! Every barrier is `unsafe`: FSTM cannot check that an address is valid
//! for the access. Callers must also respect:
//!
//! 1. **Alignment**: a statically aligned type (`u32`, `f64`, ...) must sit
//!    at an address aligned to `min(size, W)`. Use [`types::Packed`] for
//!    values with no alignment guarantee.
//! 2. **Stack regions**: a stack value must not straddle the boundary of a
//!    nested scope.
//!
//! ### Thread Safety
//!
//! - A `Barrier` is `Send + Sync` and holds no per-transaction state
//! - Each call borrows its own transaction handle mutably
//! - Statistics use relaxed atomics
//!
//! ## Modules
//!
//! - [`barrier`]: Masks, address decomposition, policies and the typed barrier
//! - [`config`]: Barrier configuration and validation
//! - [`engine`]: The transaction engine interface
//! - [`error`]: Error types for all FSTM operations
//! - [`surface`]: Typed ABI entry points and bulk operations
//! - [`types`]: Values the barriers can move
//! - [`util`]: Utility functions and constants
//! - [`write_set`]: Redo log for lazy versioning

// Core modules
pub mod config;
pub mod engine;
pub mod error;

// Barrier pipeline
pub mod barrier;
pub mod surface;
pub mod types;
pub mod write_set;

// Utilities
pub mod util;

// Re-export main types for convenience
pub use barrier::{
    make_mask, Barrier, BarrierStats, BarrierStatsSnapshot, BufferedWrite, ByteMask, CheckWriteSet,
    DirectWrite, EagerBarrier, EngineReadOnly, LazyBarrier, NoFilter, NoRaw, NoReadOnly, RedoRaw,
    StackFilter,
};
pub use config::{StmConfig, Versioning};
pub use engine::{BufferedTx, TxEngine};
pub use error::{AbortReason, Result, StmError};
pub use surface::Transfer;
pub use types::{Complex, LongDouble, Packed, Transactional, V128, V256, V64};
pub use util::constants::{Word, WORD_SIZE};
pub use write_set::{WriteSet, WriteSetEntry};

/// FSTM version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
