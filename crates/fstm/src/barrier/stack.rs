//! Stack Write Filter
//!
//! Stack slots that belong to the running transaction do not need
//! conflict detection: no other thread can see them. The filter classifies
//! an address against the stack bounds of the open scopes and lets the
//! barrier touch such slots in place.
//!
//! ```text
//!  high addresses
//!   +----------------------+  outer_high  (sp at outermost scope entry)
//!   | live across scopes   |  InPlaceLogged: undo-logged, then in place
//!   +----------------------+  inner_high  (sp at innermost scope entry)
//!   | innermost scope only |  InPlace: plain access
//!   +----------------------+  stack_pointer
//!   | dead / not stack     |  Instrument
//!  low addresses
//! ```
//!
//! Anything above `outer_high` was live before the transaction began and is
//! instrumented like shared memory.
//!
//! An access is assumed to lie entirely inside one region. A value that
//! straddles `inner_high` is classified by its first byte.

use crate::engine::TxEngine;
use crate::error::Result;
use std::ptr;

/// Stack bounds captured at one barrier call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    /// Current stack pointer
    pub stack_pointer: usize,
    /// Stack pointer at entry to the innermost open scope
    pub inner_high: usize,
    /// Stack pointer at entry to the outermost open scope
    pub outer_high: usize,
}

impl StackRegion {
    pub const fn new(stack_pointer: usize, inner_high: usize, outer_high: usize) -> Self {
        StackRegion {
            stack_pointer,
            inner_high,
            outer_high,
        }
    }

    /// Bounds of `tx` as seen from the calling frame
    #[inline(always)]
    pub fn capture<E: TxEngine + ?Sized>(tx: &E) -> Self {
        StackRegion {
            stack_pointer: stack_pointer(),
            inner_high: tx.inner_stack_high(),
            outer_high: tx.outer_stack_high(),
        }
    }
}

/// How the barrier should treat an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackDecision {
    /// Go through the transaction engine
    Instrument,
    /// Plain access, no logging
    InPlace,
    /// Undo-log the bytes, then access in place
    InPlaceLogged,
}

impl StackDecision {
    #[inline(always)]
    pub const fn is_in_place(self) -> bool {
        !matches!(self, StackDecision::Instrument)
    }
}

/// Classify `addr` against `region`
#[inline(always)]
pub const fn classify(addr: usize, region: &StackRegion) -> StackDecision {
    if addr < region.stack_pointer {
        return StackDecision::Instrument;
    }
    if addr > region.outer_high {
        return StackDecision::Instrument;
    }
    if addr < region.inner_high {
        return StackDecision::InPlace;
    }
    StackDecision::InPlaceLogged
}

/// Prefilter run before any transactional access
pub trait Prefilter {
    /// Whether the filter can ever bypass the engine
    const ENABLED: bool;

    fn classify<E: TxEngine + ?Sized>(tx: &E, addr: usize) -> StackDecision;
}

/// Every access goes to the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl Prefilter for NoFilter {
    const ENABLED: bool = false;

    #[inline(always)]
    fn classify<E: TxEngine + ?Sized>(_tx: &E, _addr: usize) -> StackDecision {
        StackDecision::Instrument
    }
}

/// Transaction-local stack slots bypass the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackFilter;

impl Prefilter for StackFilter {
    const ENABLED: bool = true;

    #[inline(always)]
    fn classify<E: TxEngine + ?Sized>(tx: &E, addr: usize) -> StackDecision {
        classify(addr, &StackRegion::capture(tx))
    }
}

/// Read a stack-resident value in place
///
/// # Safety
///
/// `addr` must be valid for reads of `T`.
#[inline(always)]
pub unsafe fn read_in_place<T: Copy>(addr: *const T) -> T {
    ptr::read_unaligned(addr)
}

/// Write a stack-resident value in place, logging it first when
/// `decision` is [`StackDecision::InPlaceLogged`]
///
/// # Safety
///
/// `addr` must be valid for reads and writes of `T`.
#[inline]
pub unsafe fn write_in_place<T: Copy, E: TxEngine + ?Sized>(
    tx: &mut E,
    addr: *mut T,
    value: T,
    decision: StackDecision,
) -> Result<()> {
    debug_assert!(decision.is_in_place());
    if decision == StackDecision::InPlaceLogged {
        log::trace!("stack: logging {} bytes at {:p}", std::mem::size_of::<T>(), addr);
        tx.log(addr.cast::<u8>(), std::mem::size_of::<T>())?;
    }
    ptr::write_unaligned(addr, value);
    Ok(())
}

/// Current stack pointer
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn stack_pointer() -> usize {
    let sp: usize;
    unsafe {
        std::arch::asm!(
            "mov {}, rsp",
            out(reg) sp,
            options(nomem, nostack, preserves_flags)
        );
    }
    sp
}

/// Current stack pointer
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn stack_pointer() -> usize {
    let sp: usize;
    unsafe {
        std::arch::asm!(
            "mov {}, sp",
            out(reg) sp,
            options(nomem, nostack, preserves_flags)
        );
    }
    sp
}

/// Approximate stack pointer (fallback for unsupported architectures)
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(never)]
pub fn stack_pointer() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}
