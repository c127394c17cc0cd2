//! Bulk Barriers - memcpy, memmove, memset
//!
//! Byte-range operations walk the range word by word with a
//! [`ByteRangePlan`]: the first and last words carry partial masks, every
//! word in between is full. Data moves through a fixed stack buffer of
//! `BULK_CHUNK_BYTES`, so arbitrarily long ranges need no allocation.
//!
//! Each side of a copy is either transactional or plain memory
//! ([`Transfer`]). A transactional side is still run through the stack
//! prefilter, classified by its first byte.

use crate::barrier::accessor::{self, RawPolicy, ReadOnlyPolicy, WriteSink};
use crate::barrier::plan::ByteRangePlan;
use crate::barrier::stack::{Prefilter, StackDecision};
use crate::barrier::Barrier;
use crate::engine::TxEngine;
use crate::error::Result;
use crate::util::constants::{Word, BULK_CHUNK_BYTES, WORD_SIZE};
use std::ptr;

/// How one side of a bulk operation is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transfer {
    /// Through the transaction engine
    #[default]
    Transactional,
    /// Plain memory access (thread-private or not yet published)
    NonTransactional,
}

impl<F: Prefilter, R, O, S> Barrier<F, R, O, S> {
    /// Transactional copy of `len` bytes from `src` to `dst`
    ///
    /// # Safety
    ///
    /// Both ranges must be valid and must not overlap.
    pub unsafe fn memcpy<E>(&self, tx: &mut E, dst: *mut u8, src: *const u8, len: usize) -> Result<()>
    where
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
        S: WriteSink<E>,
    {
        self.memcpy_with(tx, dst, Transfer::Transactional, src, Transfer::Transactional, len)
    }

    /// Copy with each side accessed as given
    ///
    /// # Safety
    ///
    /// Both ranges must be valid and must not overlap.
    pub unsafe fn memcpy_with<E>(
        &self,
        tx: &mut E,
        dst: *mut u8,
        dst_mode: Transfer,
        src: *const u8,
        src_mode: Transfer,
        len: usize,
    ) -> Result<()>
    where
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
        S: WriteSink<E>,
    {
        debug_assert!(
            dst as usize >= src as usize + len || src as usize >= dst as usize + len,
            "memcpy ranges overlap"
        );
        self.copy_forward(tx, dst, dst_mode, src, src_mode, len)
    }

    /// Transactional copy that tolerates overlapping ranges
    ///
    /// # Safety
    ///
    /// Both ranges must be valid.
    pub unsafe fn memmove<E>(&self, tx: &mut E, dst: *mut u8, src: *const u8, len: usize) -> Result<()>
    where
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
        S: WriteSink<E>,
    {
        self.memmove_with(tx, dst, Transfer::Transactional, src, Transfer::Transactional, len)
    }

    /// Overlap-tolerant copy with each side accessed as given
    ///
    /// # Safety
    ///
    /// Both ranges must be valid.
    pub unsafe fn memmove_with<E>(
        &self,
        tx: &mut E,
        dst: *mut u8,
        dst_mode: Transfer,
        src: *const u8,
        src_mode: Transfer,
        len: usize,
    ) -> Result<()>
    where
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
        S: WriteSink<E>,
    {
        let (d, s) = (dst as usize, src as usize);
        if d <= s || d >= s + len {
            return self.copy_forward(tx, dst, dst_mode, src, src_mode, len);
        }

        // dst overlaps the tail of src: copy chunks from the end
        let mut buf = [0u8; BULK_CHUNK_BYTES];
        let mut end = len;
        while end > 0 {
            let n = end.min(BULK_CHUNK_BYTES);
            let start = end - n;
            self.read_bytes(tx, src.add(start), &mut buf[..n], src_mode)?;
            self.write_bytes(tx, dst.add(start), &buf[..n], dst_mode)?;
            end = start;
        }
        Ok(())
    }

    /// Transactional fill of `len` bytes at `dst` with `byte`
    ///
    /// # Safety
    ///
    /// The range must be valid for writes.
    pub unsafe fn memset<E>(&self, tx: &mut E, dst: *mut u8, byte: u8, len: usize) -> Result<()>
    where
        E: TxEngine + ?Sized,
        S: WriteSink<E>,
    {
        let buf = [byte; BULK_CHUNK_BYTES];
        let mut done = 0;
        while done < len {
            let n = (len - done).min(BULK_CHUNK_BYTES);
            self.write_bytes(tx, dst.add(done), &buf[..n], Transfer::Transactional)?;
            done += n;
        }
        Ok(())
    }

    /// Record `[addr, addr + len)` in the engine's undo log
    ///
    /// # Safety
    ///
    /// The range must be valid for reads.
    pub unsafe fn log_range<E>(&self, tx: &mut E, addr: *const u8, len: usize) -> Result<()>
    where
        E: TxEngine + ?Sized,
    {
        if len == 0 {
            return Ok(());
        }
        tx.log(addr, len)
    }

    unsafe fn copy_forward<E>(
        &self,
        tx: &mut E,
        dst: *mut u8,
        dst_mode: Transfer,
        src: *const u8,
        src_mode: Transfer,
        len: usize,
    ) -> Result<()>
    where
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
        S: WriteSink<E>,
    {
        let mut buf = [0u8; BULK_CHUNK_BYTES];
        let mut done = 0;
        while done < len {
            let n = (len - done).min(BULK_CHUNK_BYTES);
            self.read_bytes(tx, src.add(done), &mut buf[..n], src_mode)?;
            self.write_bytes(tx, dst.add(done), &buf[..n], dst_mode)?;
            done += n;
        }
        Ok(())
    }

    /// Fill `buf` from `src`
    unsafe fn read_bytes<E>(&self, tx: &mut E, src: *const u8, buf: &mut [u8], mode: Transfer) -> Result<()>
    where
        E: TxEngine + ?Sized,
        R: RawPolicy<E>,
        O: ReadOnlyPolicy<E>,
    {
        if buf.is_empty() {
            return Ok(());
        }

        if mode == Transfer::NonTransactional || F::classify(tx, src as usize).is_in_place() {
            if mode == Transfer::Transactional {
                self.stats().record_stack(false);
            }
            ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len());
            return Ok(());
        }

        let plan = ByteRangePlan::new(src, buf.len());
        let words = plan.words();
        for step in plan {
            let value = accessor::read_word::<E, R, O>(tx, step.word, step.mask, self.stats())?;
            let bytes = value.to_ne_bytes();
            buf[step.start..step.start + step.len]
                .copy_from_slice(&bytes[step.offset..step.offset + step.len]);
        }
        self.stats().record_read(words);
        Ok(())
    }

    /// Store `buf` at `dst`
    unsafe fn write_bytes<E>(&self, tx: &mut E, dst: *mut u8, buf: &[u8], mode: Transfer) -> Result<()>
    where
        E: TxEngine + ?Sized,
        S: WriteSink<E>,
    {
        if buf.is_empty() {
            return Ok(());
        }

        if mode == Transfer::NonTransactional {
            ptr::copy_nonoverlapping(buf.as_ptr(), dst, buf.len());
            return Ok(());
        }

        let decision = F::classify(tx, dst as usize);
        if decision.is_in_place() {
            let logged = decision == StackDecision::InPlaceLogged;
            self.stats().record_stack(logged);
            if logged {
                tx.log(dst, buf.len())?;
            }
            ptr::copy_nonoverlapping(buf.as_ptr(), dst, buf.len());
            return Ok(());
        }

        let plan = ByteRangePlan::new(dst, buf.len());
        let words = plan.words();
        for step in plan {
            let mut bytes = [0u8; WORD_SIZE];
            bytes[step.offset..step.offset + step.len]
                .copy_from_slice(&buf[step.start..step.start + step.len]);
            accessor::write_word::<E, S>(tx, step.word, Word::from_ne_bytes(bytes), step.mask)?;
        }
        self.stats().record_write(words);
        Ok(())
    }
}
