//! Ports for snapshot byte access
//!
//! Hydration never shares a cursor: every read names its absolute offset, so
//! one [`HprofIndex`](crate::features::hprof::HprofIndex) can back any number
//! of concurrent readers.

use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

/// Random-access byte source over one heap dump
pub trait SnapshotSource: Send + Sync {
    /// Total length in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` from `offset`; `UnexpectedEof` when the source is too short
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Cumulative read counters
    fn stats(&self) -> SourceStats;

    /// Human-readable origin (path or `in-memory`)
    fn description(&self) -> String;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact_at(offset, buf)
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

/// Diagnostics snapshot of a [`SnapshotSource`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub bytes_read: u64,
    pub reads: u64,
    /// Sum of `|offset - previous end|` over all reads
    pub seek_distance: u64,
}

/// Atomic counters shared by the source implementations
#[derive(Debug, Default)]
pub struct ReadCounters {
    bytes_read: AtomicU64,
    reads: AtomicU64,
    seek_distance: AtomicU64,
    last_end: AtomicU64,
}

impl ReadCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a read of `len` bytes at `offset`
    pub fn record(&self, offset: u64, len: usize) {
        let len = len as u64;
        let previous_end = self.last_end.swap(offset + len, Ordering::Relaxed);
        self.seek_distance
            .fetch_add(offset.abs_diff(previous_end), Ordering::Relaxed);
        self.bytes_read.fetch_add(len, Ordering::Relaxed);
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SourceStats {
        SourceStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            seek_distance: self.seek_distance.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_counters_track_seeks() {
        let counters = ReadCounters::new();
        counters.record(0, 10);
        counters.record(10, 5);
        counters.record(100, 4);
        counters.record(0, 1);
        let stats = counters.snapshot();
        assert_eq!(stats.reads, 4);
        assert_eq!(stats.bytes_read, 20);
        // 0 + 0 + 85 + 104
        assert_eq!(stats.seek_distance, 189);
    }
}
