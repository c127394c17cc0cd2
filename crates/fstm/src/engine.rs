//! Transaction Engine Interface
//!
//! The barrier layer never detects conflicts or versions memory itself. It
//! reaches the transaction engine only through [`TxEngine`]: one masked word
//! at a time, plus the undo log for stack slots and the stack bounds of the
//! open scopes.
//!
//! A handle is borrowed mutably for the duration of a single barrier call
//! and never retained.

use crate::barrier::mask::ByteMask;
use crate::error::Result;
use crate::util::constants::Word;
use crate::write_set::WriteSet;

/// Transaction handle seen by the barriers
///
/// # Safety contract of the word operations
///
/// Callers pass word-aligned addresses of memory that is valid for the
/// access. Only the bytes selected by `mask` belong to the access; the
/// engine must not version or conflict-check the others.
pub trait TxEngine {
    /// Transactional read of one word
    ///
    /// Bytes outside `mask` in the returned word are unspecified.
    ///
    /// # Safety
    ///
    /// `addr` must be word aligned and valid for reads.
    unsafe fn tm_read(&mut self, addr: *const Word, mask: ByteMask) -> Result<Word>;

    /// Transactional read on the read-only path
    ///
    /// # Safety
    ///
    /// Same as [`TxEngine::tm_read`].
    unsafe fn tm_read_ro(&mut self, addr: *const Word, mask: ByteMask) -> Result<Word> {
        self.tm_read(addr, mask)
    }

    /// Transactional write of the masked bytes of `value`
    ///
    /// # Safety
    ///
    /// `addr` must be word aligned and valid for writes.
    unsafe fn tm_write(&mut self, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()>;

    /// Record `[addr, addr + len)` in the undo log of the innermost scope
    ///
    /// # Safety
    ///
    /// The range must be valid for reads.
    unsafe fn log(&mut self, addr: *const u8, len: usize) -> Result<()>;

    /// Stack pointer at entry to the innermost open scope, 0 when none
    fn inner_stack_high(&self) -> usize;

    /// Stack pointer at entry to the outermost open scope, 0 when none
    fn outer_stack_high(&self) -> usize;

    /// Whether the transaction has not written anything yet
    fn is_read_only(&self) -> bool {
        false
    }
}

/// Engine that buffers writes in a redo log until commit
pub trait BufferedTx: TxEngine {
    fn write_set(&self) -> &WriteSet;

    fn write_set_mut(&mut self) -> &mut WriteSet;
}

impl<E: TxEngine + ?Sized> TxEngine for &mut E {
    unsafe fn tm_read(&mut self, addr: *const Word, mask: ByteMask) -> Result<Word> {
        (**self).tm_read(addr, mask)
    }

    unsafe fn tm_read_ro(&mut self, addr: *const Word, mask: ByteMask) -> Result<Word> {
        (**self).tm_read_ro(addr, mask)
    }

    unsafe fn tm_write(&mut self, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()> {
        (**self).tm_write(addr, value, mask)
    }

    unsafe fn log(&mut self, addr: *const u8, len: usize) -> Result<()> {
        (**self).log(addr, len)
    }

    fn inner_stack_high(&self) -> usize {
        (**self).inner_stack_high()
    }

    fn outer_stack_high(&self) -> usize {
        (**self).outer_stack_high()
    }

    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }
}

impl<E: BufferedTx + ?Sized> BufferedTx for &mut E {
    fn write_set(&self) -> &WriteSet {
        (**self).write_set()
    }

    fn write_set_mut(&mut self) -> &mut WriteSet {
        (**self).write_set_mut()
    }
}
