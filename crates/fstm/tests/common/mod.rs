//! Test Utilities for FSTM Barrier Tests
//!
//! Reference engines that record every word access the barriers issue, so
//! tests can assert on the exact (address, mask) sequence as well as on
//! memory contents.
//!
//! ============================================================================
//! CRITICAL: The engines check masks strictly. A barrier that hands the
//! engine an empty mask, an unaligned word, or a mask reaching past the
//! value fails here instead of silently working.
//! ============================================================================

#![allow(dead_code)]

use fstm::{
    AbortReason, BufferedTx, ByteMask, Result, StmConfig, StmError, TxEngine, Versioning, Word,
    WriteSet, WORD_SIZE,
};
use parking_lot::Mutex;
use std::ptr;
use std::sync::Arc;

/// ============================================================================
/// OPERATION TRACE
/// ============================================================================

/// One engine call made by a barrier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read { addr: usize, mask: ByteMask, read_only: bool },
    Write { addr: usize, value: Word, mask: ByteMask },
    Log { addr: usize, len: usize },
}

impl Op {
    pub fn is_read(&self) -> bool {
        matches!(self, Op::Read { .. })
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Op::Write { .. })
    }
}

/// ============================================================================
/// TEST ENGINE
/// ============================================================================

/// Open nested scope with its undo log
struct Scope {
    high: usize,
    undo: Vec<(usize, Vec<u8>)>,
}

/// Single-threaded reference engine
///
/// - Eager mode: `tm_write` stores in place and keeps a word undo log
/// - Lazy mode: writes land in the write set until [`TestEngine::commit`]
/// - Scopes: `log` saves bytes into the innermost scope;
///   [`TestEngine::cancel_inner`] restores them
pub struct TestEngine {
    pub mode: Versioning,
    pub ops: Vec<Op>,
    write_set: WriteSet,
    undo: Vec<(usize, Word)>,
    scopes: Vec<Scope>,
    abort_after: Option<usize>,
    word_ops: usize,
    read_only: bool,
}

impl TestEngine {
    pub fn new(mode: Versioning) -> Self {
        Self::with_config(&StmConfig {
            versioning: mode,
            ..StmConfig::default()
        })
    }

    /// Engine whose mode and redo log size come from `config`
    pub fn with_config(config: &StmConfig) -> Self {
        TestEngine {
            mode: config.versioning,
            ops: Vec::new(),
            write_set: WriteSet::from_config(config),
            undo: Vec::new(),
            scopes: Vec::new(),
            abort_after: None,
            word_ops: 0,
            read_only: false,
        }
    }

    pub fn eager() -> Self {
        Self::new(Versioning::Eager)
    }

    pub fn lazy() -> Self {
        Self::new(Versioning::Lazy)
    }

    /// Abort on the word access after the first `n`
    ///
    /// **Bug this finds:** Barriers that swallow aborts or keep issuing
    /// accesses after one failed
    pub fn abort_after(mut self, n: usize) -> Self {
        self.abort_after = Some(n);
        self
    }

    /// Report the transaction as read-only to `EngineReadOnly` barriers
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Open a scope whose frame starts at `high`
    pub fn begin_scope(&mut self, high: usize) {
        self.scopes.push(Scope {
            high,
            undo: Vec::new(),
        });
    }

    /// Close the innermost scope keeping its effects
    ///
    /// Its undo entries move to the parent so an outer cancel still
    /// restores them.
    pub fn commit_inner(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            if let Some(parent) = self.scopes.last_mut() {
                parent.undo.extend(scope.undo);
            }
        }
    }

    /// Roll back the innermost scope's logged bytes and close it
    pub fn cancel_inner(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for (addr, bytes) in scope.undo.into_iter().rev() {
                unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), addr as *mut u8, bytes.len()) };
            }
        }
    }

    /// Publish buffered writes (lazy) and forget the undo log (eager)
    pub fn commit(&mut self) {
        unsafe { self.write_set.writeback() };
        self.write_set.reset();
        self.undo.clear();
    }

    /// Undo eager writes and drop buffered ones
    pub fn rollback(&mut self) {
        for (addr, old) in self.undo.drain(..).rev() {
            unsafe { ptr::write(addr as *mut Word, old) };
        }
        self.write_set.reset();
    }

    pub fn reads(&self) -> Vec<&Op> {
        self.ops.iter().filter(|op| op.is_read()).collect()
    }

    pub fn writes(&self) -> Vec<&Op> {
        self.ops.iter().filter(|op| op.is_write()).collect()
    }

    pub fn logs(&self) -> Vec<&Op> {
        self.ops.iter().filter(|op| matches!(op, Op::Log { .. })).collect()
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    fn word_access(&mut self, addr: usize, mask: ByteMask) -> Result<()> {
        assert_eq!(addr % WORD_SIZE, 0, "unaligned word access at {:#x}", addr);
        assert!(!mask.is_empty(), "empty mask at {:#x}", addr);

        if let Some(limit) = self.abort_after {
            if self.word_ops >= limit {
                return Err(StmError::aborted(addr, AbortReason::Conflict));
            }
        }
        self.word_ops += 1;
        Ok(())
    }
}

impl TxEngine for TestEngine {
    unsafe fn tm_read(&mut self, addr: *const Word, mask: ByteMask) -> Result<Word> {
        self.word_access(addr as usize, mask)?;
        self.ops.push(Op::Read {
            addr: addr as usize,
            mask,
            read_only: false,
        });
        Ok(ptr::read(addr))
    }

    unsafe fn tm_read_ro(&mut self, addr: *const Word, mask: ByteMask) -> Result<Word> {
        self.word_access(addr as usize, mask)?;
        self.ops.push(Op::Read {
            addr: addr as usize,
            mask,
            read_only: true,
        });
        Ok(ptr::read(addr))
    }

    unsafe fn tm_write(&mut self, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()> {
        self.word_access(addr as usize, mask)?;
        self.ops.push(Op::Write {
            addr: addr as usize,
            value,
            mask,
        });

        let old = ptr::read(addr);
        self.undo.push((addr as usize, old));
        ptr::write(addr, mask.select(value, old));
        Ok(())
    }

    unsafe fn log(&mut self, addr: *const u8, len: usize) -> Result<()> {
        self.ops.push(Op::Log {
            addr: addr as usize,
            len,
        });
        let bytes = std::slice::from_raw_parts(addr, len).to_vec();
        match self.scopes.last_mut() {
            Some(scope) => scope.undo.push((addr as usize, bytes)),
            None => panic!("log outside of any scope at {:p}", addr),
        }
        Ok(())
    }

    fn inner_stack_high(&self) -> usize {
        self.scopes.last().map_or(0, |s| s.high)
    }

    fn outer_stack_high(&self) -> usize {
        self.scopes.first().map_or(0, |s| s.high)
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl BufferedTx for TestEngine {
    fn write_set(&self) -> &WriteSet {
        &self.write_set
    }

    fn write_set_mut(&mut self) -> &mut WriteSet {
        &mut self.write_set
    }
}

/// ============================================================================
/// SHARED ENGINE
/// ============================================================================

/// Eager engine for threaded tests
///
/// Every word access runs under one global lock, so read-modify-write of a
/// masked word is atomic with respect to other threads.
#[derive(Clone)]
pub struct SharedEngine {
    lock: Arc<Mutex<()>>,
}

impl SharedEngine {
    pub fn new() -> Self {
        SharedEngine {
            lock: Arc::new(Mutex::new(())),
        }
    }
}

impl TxEngine for SharedEngine {
    unsafe fn tm_read(&mut self, addr: *const Word, _mask: ByteMask) -> Result<Word> {
        let _guard = self.lock.lock();
        Ok(ptr::read_volatile(addr))
    }

    unsafe fn tm_write(&mut self, addr: *mut Word, value: Word, mask: ByteMask) -> Result<()> {
        let _guard = self.lock.lock();
        let old = ptr::read_volatile(addr);
        ptr::write_volatile(addr, mask.select(value, old));
        Ok(())
    }

    unsafe fn log(&mut self, _addr: *const u8, _len: usize) -> Result<()> {
        Ok(())
    }

    fn inner_stack_high(&self) -> usize {
        0
    }

    fn outer_stack_high(&self) -> usize {
        0
    }
}

/// ============================================================================
/// MEMORY FIXTURE
/// ============================================================================

/// Word-aligned heap buffer
///
/// **Bug this finds:** Writes that spill past the value into neighbouring
/// bytes (the buffer starts filled with a known pattern)
pub struct WordBuffer {
    words: Box<[Word]>,
}

impl WordBuffer {
    /// Buffer of `len` words, every byte set to `fill`
    pub fn new(len: usize, fill: u8) -> Self {
        WordBuffer {
            words: vec![Word::from_ne_bytes([fill; WORD_SIZE]); len].into_boxed_slice(),
        }
    }

    pub fn len_bytes(&self) -> usize {
        self.words.len() * WORD_SIZE
    }

    /// Address of byte `offset`
    pub fn at<T>(&mut self, offset: usize) -> *mut T {
        assert!(offset < self.len_bytes());
        unsafe { self.words.as_mut_ptr().cast::<u8>().add(offset).cast::<T>() }
    }

    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.len_bytes()) }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len_bytes();
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), len) }
    }

    /// Assert every byte outside `[start, end)` still equals `fill`
    pub fn assert_untouched_outside(&self, start: usize, end: usize, fill: u8) {
        for (i, byte) in self.bytes().iter().enumerate() {
            if i < start || i >= end {
                assert_eq!(*byte, fill, "byte {} outside [{}, {}) was modified", i, start, end);
            }
        }
    }
}

/// Bytes of a `Copy` value
pub fn bytes_of<T: Copy>(value: &T) -> Vec<u8> {
    unsafe { std::slice::from_raw_parts((value as *const T).cast::<u8>(), std::mem::size_of::<T>()) }
        .to_vec()
}
