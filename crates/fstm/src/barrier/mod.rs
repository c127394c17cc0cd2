//! Barrier Module - Typed Transactional Loads and Stores
//!
//! A barrier turns one typed load or store of any size and alignment into
//! a sequence of masked, word-aligned accesses the transaction engine
//! understands.
//!
//! Barrier Pipeline:
//! ```text
//!   read::<T>(tx, addr)
//!     prefilter     stack slot of this transaction?  -> in place
//!     decompose     AccessShape::resolve(descriptor, addr)
//!     plan          (word, mask) for every word the value touches
//!     access        read_word / write_word per planned word
//!     assemble      extract T from the scratch buffer at the offset
//! ```
//!
//! Policies:
//! The prefilter, read-after-write lookup, read-only path and write sink
//! are zero-sized type parameters. Each combination compiles to its own
//! straight-line code; nothing is chosen per call.
//!
//! Aborts:
//! An engine abort surfaces as `Err` from the word access that hit it and
//! is returned immediately. Words already written stay written; undoing
//! them is the engine's job.

pub mod accessor;
pub mod address;
pub mod mask;
pub mod plan;
pub mod stack;
pub mod stats;

pub use accessor::{
    BufferedWrite, CheckWriteSet, DirectWrite, EngineReadOnly, NoRaw, NoReadOnly, RawLookup,
    RawPolicy, ReadOnlyPolicy, RedoRaw, Sink, WriteSink,
};
pub use address::{AccessShape, Decomposition, TypeAccessDescriptor};
pub use mask::{make_mask, ByteMask};
pub use plan::{AccessPlan, ByteRangePlan, Scratch};
pub use stack::{NoFilter, Prefilter, StackDecision, StackFilter, StackRegion};
pub use stats::{BarrierStats, BarrierStatsSnapshot};

use crate::config::StmConfig;
use crate::engine::TxEngine;
use crate::error::Result;
use crate::types::Transactional;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

/// Barrier for eager (undo log) engines
pub type EagerBarrier = Barrier<StackFilter, NoRaw, NoReadOnly, DirectWrite>;

/// Barrier for lazy (redo log) engines
pub type LazyBarrier = Barrier<StackFilter, RedoRaw, CheckWriteSet, BufferedWrite>;

/// Barrier - typed read/write entry points over a word-granular engine
///
/// # Type Parameters
/// * `F` - stack prefilter ([`StackFilter`] or [`NoFilter`])
/// * `R` - read-after-write policy ([`NoRaw`] or [`RedoRaw`])
/// * `O` - read-only policy ([`NoReadOnly`], [`CheckWriteSet`] or
///   [`EngineReadOnly`])
/// * `S` - write sink ([`DirectWrite`] or [`BufferedWrite`])
///
/// # Thread Safety
/// A barrier holds no per-transaction state and can be shared between
/// threads; each call borrows its own transaction handle.
///
/// # Examples
///
/// ```rust,ignore
/// let barrier = EagerBarrier::new(StmConfig::eager())?;
/// let value: u32 = unsafe { barrier.read(&mut tx, addr)? };
/// unsafe { barrier.write(&mut tx, addr, value + 1)? };
/// ```
pub struct Barrier<F = StackFilter, R = NoRaw, O = NoReadOnly, S = DirectWrite> {
    config: StmConfig,
    stats: BarrierStats,
    _policies: PhantomData<fn() -> (F, R, O, S)>,
}

impl<F: Prefilter, R, O, S: Sink> Barrier<F, R, O, S> {
    /// Build a barrier from `config`
    ///
    /// Fails when the configuration is invalid or its versioning does not
    /// match the write sink `S`.
    pub fn new(config: StmConfig) -> Result<Self> {
        config.validate()?;
        config.check_versioning(S::VERSIONING)?;

        if config.verbose {
            log::info!(
                "barrier: {} versioning, stack filter {}, force_aligned={}, stats={}",
                config.versioning,
                if F::ENABLED { "on" } else { "off" },
                config.force_aligned,
                config.stats_enabled
            );
        } else {
            log::debug!(
                "barrier: {} versioning, stack filter {}",
                config.versioning,
                if F::ENABLED { "on" } else { "off" }
            );
        }

        Ok(Barrier {
            stats: BarrierStats::new(config.stats_enabled),
            config,
            _policies: PhantomData,
        })
    }
}

impl<F: Prefilter, R, O, S> Barrier<F, R, O, S> {
    pub fn config(&self) -> &StmConfig {
        &self.config
    }

    pub fn stats(&self) -> &BarrierStats {
        &self.stats
    }

    /// Access descriptor for `T` under this barrier's configuration
    #[inline(always)]
    pub fn descriptor<T: Transactional>(&self) -> TypeAccessDescriptor {
        let desc = TypeAccessDescriptor::of::<T>();
        if self.config.force_aligned {
            desc.forced_aligned()
        } else {
            desc
        }
    }

    #[inline(always)]
    fn resolve<T: Transactional>(&self, addr: usize) -> AccessShape {
        let shape = AccessShape::resolve(&self.descriptor::<T>(), addr);
        if shape.is_unaligned() {
            self.stats.record_unaligned();
            if let AccessShape::SubWordOverflowing { offset } = shape {
                log::trace!(
                    "barrier: {}-byte access at {:#x} overflows its word (offset {})",
                    size_of::<T>(),
                    addr,
                    offset
                );
            }
        }
        shape
    }

    /// Transactional read of a `T` at `addr`
    ///
    /// # Safety
    ///
    /// `addr` must be valid for reads of `T`. When `T` is statically
    /// aligned (or the barrier forces alignment), `addr` must be aligned
    /// to `min(size_of::<T>(), WORD_SIZE)`. A stack-resident value must not
    /// straddle a scope boundary.
    #[inline]
    pub unsafe fn read<T, E>(&self, tx: &mut E, addr: *const T) -> Result<T>
    where
        T: Transactional,
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
    {
        if F::classify(tx, addr as usize).is_in_place() {
            self.stats.record_stack(false);
            self.stats.record_read(0);
            return Ok(stack::read_in_place(addr));
        }

        let shape = self.resolve::<T>(addr as usize);
        let plan = shape.plan(address::base_of(addr), size_of::<T>());

        let mut scratch = Scratch::zeroed();
        for (i, (word, mask)) in plan.iter().enumerate() {
            let value = accessor::read_word::<E, R, O>(tx, word, mask, &self.stats)?;
            scratch.set_word(i, value);
        }

        self.stats.record_read(plan.len());
        Ok(shape.assemble::<T>(&scratch))
    }

    /// Transactional write of `value` to `addr`
    ///
    /// Only the bytes of the value are written; neighbouring bytes in the
    /// same words are masked out.
    ///
    /// # Safety
    ///
    /// `addr` must be valid for writes of `T`; see [`Barrier::read`] for
    /// the alignment and stack preconditions.
    #[inline]
    pub unsafe fn write<T, E>(&self, tx: &mut E, addr: *mut T, value: T) -> Result<()>
    where
        T: Transactional,
        E: TxEngine + ?Sized,
        S: WriteSink<E>,
    {
        let decision = F::classify(tx, addr as usize);
        if decision.is_in_place() {
            self.stats
                .record_stack(decision == StackDecision::InPlaceLogged);
            self.stats.record_write(0);
            return stack::write_in_place(tx, addr, value, decision);
        }

        let shape = self.resolve::<T>(addr as usize);
        let plan = shape.plan(address::base_of(addr), size_of::<T>());
        let scratch = shape.disassemble(value);

        for (i, (word, mask)) in plan.iter().enumerate() {
            accessor::write_word::<E, S>(tx, word, scratch.word(i), mask)?;
        }

        self.stats.record_write(plan.len());
        Ok(())
    }

    /// Record the bytes of the `T` at `addr` in the engine's undo log
    ///
    /// # Safety
    ///
    /// `addr` must be valid for reads of `T`.
    #[inline]
    pub unsafe fn log<T, E>(&self, tx: &mut E, addr: *const T) -> Result<()>
    where
        T: Transactional,
        E: TxEngine + ?Sized,
    {
        tx.log(addr.cast::<u8>(), size_of::<T>())
    }
}

impl<F, R, O, S> fmt::Debug for Barrier<F, R, O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Barrier")
            .field("prefilter", &std::any::type_name::<F>())
            .field("raw", &std::any::type_name::<R>())
            .field("read_only", &std::any::type_name::<O>())
            .field("sink", &std::any::type_name::<S>())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, Versioning};
    use crate::error::StmError;

    #[test]
    fn test_new_checks_versioning() {
        assert!(EagerBarrier::new(StmConfig::eager()).is_ok());
        assert!(LazyBarrier::new(StmConfig::lazy()).is_ok());

        let err = LazyBarrier::new(StmConfig::eager()).unwrap_err();
        assert!(matches!(
            err,
            StmError::Configuration(ConfigError::VersioningMismatch {
                configured: Versioning::Eager,
                required: Versioning::Lazy,
            })
        ));
    }

    #[test]
    fn test_new_validates() {
        let config = StmConfig {
            write_set_capacity: 0,
            ..StmConfig::eager()
        };
        assert!(EagerBarrier::new(config).is_err());
    }

    #[test]
    fn test_force_aligned_descriptor() {
        use crate::types::Packed;

        let config = StmConfig {
            force_aligned: true,
            ..StmConfig::eager()
        };
        let barrier = EagerBarrier::new(config).unwrap();
        assert!(barrier.descriptor::<Packed<u64>>().assumed_aligned);

        let barrier = EagerBarrier::new(StmConfig::eager()).unwrap();
        assert!(!barrier.descriptor::<Packed<u64>>().assumed_aligned);
    }

    #[test]
    fn test_debug_names_policies() {
        let barrier = LazyBarrier::new(StmConfig::lazy()).unwrap();
        let text = format!("{:?}", barrier);
        assert!(text.contains("RedoRaw"));
        assert!(text.contains("BufferedWrite"));
    }
}
