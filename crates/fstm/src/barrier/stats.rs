//! Barrier Statistics - Performance Monitoring
//!
//! Counters for barrier activity. Used for:
//! - Profiling instrumented code
//! - Tuning the policy choice (RAW forwarding, stack filter)
//! - Spotting unaligned access hot spots
//!
//! Metrics tracked:
//! - Typed reads and writes, and the words they expanded into
//! - Read-after-write hits (full and partial)
//! - Stack accesses done in place, with and without logging
//! - Accesses that straddled a word boundary
//! - Reads served by the read-only primitive

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// BarrierStatsSnapshot - point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierStatsSnapshot {
    /// Typed reads
    pub reads: u64,
    /// Typed writes
    pub writes: u64,
    /// Word reads issued for typed reads
    pub words_read: u64,
    /// Word writes issued for typed writes
    pub words_written: u64,
    /// Words served entirely from the write set
    pub raw_hits: u64,
    /// Words served partly from the write set
    pub raw_partial_hits: u64,
    /// Stack accesses done in place without logging
    pub stack_bypasses: u64,
    /// Stack writes logged and done in place
    pub stack_logged: u64,
    /// Accesses that straddled a word boundary
    pub unaligned_accesses: u64,
    /// Word reads on the read-only path
    pub read_only_reads: u64,
}

impl BarrierStatsSnapshot {
    /// Merge stats from another source (for aggregation)
    ///
    /// Used to combine stats from several barriers or threads.
    pub fn merge(&mut self, other: &BarrierStatsSnapshot) {
        self.reads += other.reads;
        self.writes += other.writes;
        self.words_read += other.words_read;
        self.words_written += other.words_written;
        self.raw_hits += other.raw_hits;
        self.raw_partial_hits += other.raw_partial_hits;
        self.stack_bypasses += other.stack_bypasses;
        self.stack_logged += other.stack_logged;
        self.unaligned_accesses += other.unaligned_accesses;
        self.read_only_reads += other.read_only_reads;
    }

    /// Typed accesses of either kind
    #[inline]
    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }

    /// Share of word reads forwarded from the write set (percentage)
    pub fn raw_hit_rate(&self) -> f64 {
        percent(self.raw_hits + self.raw_partial_hits, self.words_read)
    }

    /// Share of accesses that skipped the engine via the stack filter
    /// (percentage)
    pub fn stack_bypass_rate(&self) -> f64 {
        percent(self.stack_bypasses + self.stack_logged, self.accesses())
    }

    /// Share of accesses that straddled a word boundary (percentage)
    pub fn unaligned_rate(&self) -> f64 {
        percent(self.unaligned_accesses, self.accesses())
    }

    /// Average words touched per instrumented access
    pub fn words_per_access(&self) -> f64 {
        let instrumented = self
            .accesses()
            .saturating_sub(self.stack_bypasses + self.stack_logged);
        if instrumented == 0 {
            0.0
        } else {
            (self.words_read + self.words_written) as f64 / instrumented as f64
        }
    }

    /// Serialize as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Log a summary at info level
    pub fn log_summary(&self) {
        log::info!("{}", self);
    }
}

impl fmt::Display for BarrierStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Barrier Statistics:")?;
        writeln!(
            f,
            "  Reads: {} ({} words), Writes: {} ({} words)",
            self.reads, self.words_read, self.writes, self.words_written
        )?;
        writeln!(
            f,
            "  RAW hits: {} full, {} partial ({:.2}%)",
            self.raw_hits,
            self.raw_partial_hits,
            self.raw_hit_rate()
        )?;
        writeln!(
            f,
            "  Stack: {} in place, {} logged ({:.2}%)",
            self.stack_bypasses,
            self.stack_logged,
            self.stack_bypass_rate()
        )?;
        writeln!(
            f,
            "  Unaligned: {} ({:.2}%)",
            self.unaligned_accesses,
            self.unaligned_rate()
        )?;
        write!(f, "  Read-only word reads: {}", self.read_only_reads)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// BarrierStats - thread-safe stats collector
///
/// Relaxed atomics; a barrier shared between threads records without
/// locking. When disabled every `record_*` call is a no-op.
#[derive(Debug)]
pub struct BarrierStats {
    enabled: bool,
    reads: AtomicU64,
    writes: AtomicU64,
    words_read: AtomicU64,
    words_written: AtomicU64,
    raw_hits: AtomicU64,
    raw_partial_hits: AtomicU64,
    stack_bypasses: AtomicU64,
    stack_logged: AtomicU64,
    unaligned_accesses: AtomicU64,
    read_only_reads: AtomicU64,
}

impl BarrierStats {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            words_read: AtomicU64::new(0),
            words_written: AtomicU64::new(0),
            raw_hits: AtomicU64::new(0),
            raw_partial_hits: AtomicU64::new(0),
            stack_bypasses: AtomicU64::new(0),
            stack_logged: AtomicU64::new(0),
            unaligned_accesses: AtomicU64::new(0),
            read_only_reads: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline(always)]
    fn bump(&self, counter: &AtomicU64, n: u64) {
        if self.enabled {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Record a typed read expanded into `words` word reads
    #[inline]
    pub fn record_read(&self, words: usize) {
        self.bump(&self.reads, 1);
        self.bump(&self.words_read, words as u64);
    }

    /// Record a typed write expanded into `words` word writes
    #[inline]
    pub fn record_write(&self, words: usize) {
        self.bump(&self.writes, 1);
        self.bump(&self.words_written, words as u64);
    }

    #[inline]
    pub fn record_raw_hit(&self) {
        self.bump(&self.raw_hits, 1);
    }

    #[inline]
    pub fn record_raw_partial_hit(&self) {
        self.bump(&self.raw_partial_hits, 1);
    }

    /// Record a stack access done in place; `logged` when it was undo-logged
    #[inline]
    pub fn record_stack(&self, logged: bool) {
        if logged {
            self.bump(&self.stack_logged, 1);
        } else {
            self.bump(&self.stack_bypasses, 1);
        }
    }

    #[inline]
    pub fn record_unaligned(&self) {
        self.bump(&self.unaligned_accesses, 1);
    }

    #[inline]
    pub fn record_read_only(&self) {
        self.bump(&self.read_only_reads, 1);
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> BarrierStatsSnapshot {
        BarrierStatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            words_read: self.words_read.load(Ordering::Relaxed),
            words_written: self.words_written.load(Ordering::Relaxed),
            raw_hits: self.raw_hits.load(Ordering::Relaxed),
            raw_partial_hits: self.raw_partial_hits.load(Ordering::Relaxed),
            stack_bypasses: self.stack_bypasses.load(Ordering::Relaxed),
            stack_logged: self.stack_logged.load(Ordering::Relaxed),
            unaligned_accesses: self.unaligned_accesses.load(Ordering::Relaxed),
            read_only_reads: self.read_only_reads.load(Ordering::Relaxed),
        }
    }

    /// Reset all stats to zero
    pub fn reset(&self) {
        for counter in [
            &self.reads,
            &self.writes,
            &self.words_read,
            &self.words_written,
            &self.raw_hits,
            &self.raw_partial_hits,
            &self.stack_bypasses,
            &self.stack_logged,
            &self.unaligned_accesses,
            &self.read_only_reads,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for BarrierStats {
    fn default() -> Self {
        Self::new(true)
    }
}
