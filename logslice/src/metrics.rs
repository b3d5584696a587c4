use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters shared by every scanner of one extraction run
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    bytes_read: Arc<AtomicU64>,
    lines_read: Arc<AtomicU64>,
    lines_matched: Arc<AtomicU64>,
    chunks_completed: Arc<AtomicU64>,
    chunks_failed: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            bytes_read: Arc::new(AtomicU64::new(0)),
            lines_read: Arc::new(AtomicU64::new(0)),
            lines_matched: Arc::new(AtomicU64::new(0)),
            chunks_completed: Arc::new(AtomicU64::new(0)),
            chunks_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a finished chunk scan
    pub fn record_chunk(&self, bytes: u64, lines: u64, matched: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.lines_read.fetch_add(lines, Ordering::Relaxed);
        self.lines_matched.fetch_add(matched, Ordering::Relaxed);
        self.chunks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a chunk whose scanner failed
    pub fn record_failure(&self) {
        self.chunks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets current statistics
    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_matched: self.lines_matched.load(Ordering::Relaxed),
            chunks_completed: self.chunks_completed.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Bytes read: {}\n\
             Lines read/matched: {}/{}\n\
             Chunks completed/failed: {}/{}",
            stats.bytes_read,
            stats.lines_read,
            stats.lines_matched,
            stats.chunks_completed,
            stats.chunks_failed
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub bytes_read: u64,
    pub lines_read: u64,
    pub lines_matched: u64,
    pub chunks_completed: u64,
    pub chunks_failed: u64,
}
