//! Word Accessor - Single-Word Transactional Reads and Writes
//!
//! Every planned word goes through [`read_word`] or [`write_word`]. The
//! strategies they apply are zero-sized policy types fixed as type
//! parameters of [`Barrier`](super::Barrier):
//!
//! - [`RawPolicy`] - consult the transaction's own buffered writes before
//!   reading (read-after-write forwarding)
//! - [`ReadOnlyPolicy`] - route reads of a read-only transaction to the
//!   cheaper `tm_read_ro` primitive, skipping the RAW lookup
//! - [`WriteSink`] - where a write goes: straight to the engine (eager) or
//!   into the write set (lazy)

use super::mask::ByteMask;
use super::stats::BarrierStats;
use crate::config::Versioning;
use crate::engine::{BufferedTx, TxEngine};
use crate::error::Result;
use crate::util::constants::Word;

/// Outcome of a read-after-write lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawLookup {
    /// Nothing buffered for the requested bytes
    Miss,
    /// Every requested byte is buffered
    Hit(Word),
    /// Only `covered` of the requested bytes are buffered
    Partial { value: Word, covered: ByteMask },
}

/// Read-after-write policy
pub trait RawPolicy<E: TxEngine + ?Sized> {
    fn lookup(tx: &E, addr: *const Word, mask: ByteMask) -> RawLookup;
}

/// No read-after-write forwarding (eager engines)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRaw;

impl<E: TxEngine + ?Sized> RawPolicy<E> for NoRaw {
    #[inline(always)]
    fn lookup(_tx: &E, _addr: *const Word, _mask: ByteMask) -> RawLookup {
        RawLookup::Miss
    }
}

/// Forward from the transaction's redo log (lazy engines)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedoRaw;

impl<E: BufferedTx + ?Sized> RawPolicy<E> for RedoRaw {
    #[inline]
    fn lookup(tx: &E, addr: *const Word, mask: ByteMask) -> RawLookup {
        let entry = match tx.write_set().find(addr) {
            Some(entry) => entry,
            None => return RawLookup::Miss,
        };

        let covered = entry.mask.intersect(mask);
        if covered.is_empty() {
            RawLookup::Miss
        } else if covered == mask {
            RawLookup::Hit(entry.value)
        } else {
            RawLookup::Partial {
                value: entry.value,
                covered,
            }
        }
    }
}

/// Read-only fast path policy
pub trait ReadOnlyPolicy<E: TxEngine + ?Sized> {
    fn is_read_only(tx: &E) -> bool;
}

/// Always take the general read path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoReadOnly;

impl<E: TxEngine + ?Sized> ReadOnlyPolicy<E> for NoReadOnly {
    #[inline(always)]
    fn is_read_only(_tx: &E) -> bool {
        false
    }
}

/// Read-only while the redo log is empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckWriteSet;

impl<E: BufferedTx + ?Sized> ReadOnlyPolicy<E> for CheckWriteSet {
    #[inline(always)]
    fn is_read_only(tx: &E) -> bool {
        tx.write_set().is_empty()
    }
}

/// Ask the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineReadOnly;

impl<E: TxEngine + ?Sized> ReadOnlyPolicy<E> for EngineReadOnly {
    #[inline(always)]
    fn is_read_only(tx: &E) -> bool {
        tx.is_read_only()
    }
}

/// Versioning implemented by a write sink
pub trait Sink {
    const VERSIONING: Versioning;
}

/// Write strategy for one masked word
pub trait WriteSink<E: TxEngine + ?Sized>: Sink {
    /// # Safety
    ///
    /// `addr` must be word aligned and valid for writes.
    unsafe fn write(tx: &mut E, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()>;
}

/// In-place writes through `tm_write`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectWrite;

impl Sink for DirectWrite {
    const VERSIONING: Versioning = Versioning::Eager;
}

impl<E: TxEngine + ?Sized> WriteSink<E> for DirectWrite {
    #[inline(always)]
    unsafe fn write(tx: &mut E, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()> {
        tx.tm_write(addr, value, mask)
    }
}

/// Buffered writes in the transaction's write set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferedWrite;

impl Sink for BufferedWrite {
    const VERSIONING: Versioning = Versioning::Lazy;
}

impl<E: BufferedTx + ?Sized> WriteSink<E> for BufferedWrite {
    #[inline(always)]
    unsafe fn write(tx: &mut E, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()> {
        tx.write_set_mut().insert(addr, value, mask);
        Ok(())
    }
}

/// Read the masked bytes of one word
///
/// # Safety
///
/// `addr` must be word aligned and valid for reads.
#[inline]
pub unsafe fn read_word<E, R, O>(
    tx: &mut E,
    addr: *const Word,
    mask: ByteMask,
    stats: &BarrierStats,
) -> Result<Word>
where
    E: TxEngine + ?Sized,
    R: RawPolicy<E>,
    O: ReadOnlyPolicy<E>,
{
    if O::is_read_only(tx) {
        stats.record_read_only();
        return tx.tm_read_ro(addr, mask);
    }

    match R::lookup(tx, addr, mask) {
        RawLookup::Miss => tx.tm_read(addr, mask),
        RawLookup::Hit(value) => {
            stats.record_raw_hit();
            Ok(value)
        }
        RawLookup::Partial { value, covered } => {
            log::trace!("raw: partial hit at {:p} ({:?} of {:?})", addr, covered, mask);
            stats.record_raw_partial_hit();
            let fresh = tx.tm_read(addr, mask.difference(covered))?;
            Ok(covered.select(value, fresh))
        }
    }
}

/// Write the masked bytes of one word
///
/// # Safety
///
/// `addr` must be word aligned and valid for writes.
#[inline(always)]
pub unsafe fn write_word<E, S>(tx: &mut E, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()>
where
    E: TxEngine + ?Sized,
    S: WriteSink<E>,
{
    S::write(tx, addr, value, mask)
}
