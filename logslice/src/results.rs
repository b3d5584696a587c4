//! Reports produced by an extraction run.
//!
//! Every chunk gets a [`ChunkReport`], including chunks whose scanner failed.
//! A failed chunk contributes no matches, so a summary with failures is an
//! undercount and callers should treat it as a partial result.
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::ChunkRange;

/// Outcome of scanning one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Completed,
    /// The scanner could not read its range; the message is the error text
    Failed(String),
}

/// What one scanner did with its range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub index: usize,
    pub range: ChunkRange,
    pub lines_read: u64,
    pub bytes_read: u64,
    pub matches: u64,
    pub status: ChunkStatus,
}

impl ChunkReport {
    pub fn completed(
        index: usize,
        range: ChunkRange,
        lines_read: u64,
        bytes_read: u64,
        matches: u64,
    ) -> Self {
        Self {
            index,
            range,
            lines_read,
            bytes_read,
            matches,
            status: ChunkStatus::Completed,
        }
    }

    pub fn failed(index: usize, range: ChunkRange, reason: impl fmt::Display) -> Self {
        Self {
            index,
            range,
            lines_read: 0,
            bytes_read: 0,
            matches: 0,
            status: ChunkStatus::Failed(reason.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ChunkStatus::Failed(_))
    }
}

/// The complete result of an extraction run
#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    /// Where matched lines were written
    pub output_path: PathBuf,
    /// The prefix lines were matched against
    pub prefix: String,
    /// Number of workers the source was split for
    pub worker_count: usize,
    /// Per-chunk reports, in chunk-index order
    pub chunks: Vec<ChunkReport>,
    /// Total matched lines written
    pub total_matches: u64,
    /// Total lines read across all chunks
    pub lines_scanned: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl ExtractSummary {
    /// Creates an empty summary for the given output
    pub fn new(
        output_path: impl Into<PathBuf>,
        prefix: impl Into<String>,
        worker_count: usize,
    ) -> Self {
        Self {
            output_path: output_path.into(),
            prefix: prefix.into(),
            worker_count,
            ..Default::default()
        }
    }

    /// Adds a chunk report and updates the totals
    pub fn add_chunk(&mut self, report: ChunkReport) {
        self.total_matches += report.matches;
        self.lines_scanned += report.lines_read;
        self.chunks.push(report);
    }

    /// Chunks whose scanner failed
    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| c.is_failed())
    }

    pub fn is_complete(&self) -> bool {
        self.failed_chunks().next().is_none()
    }

    /// One-line statistics such as `3 matches in 10 lines across 4 chunks (1ms)`
    pub fn stats_line(&self) -> String {
        format!(
            "{} matches in {} lines across {} chunks ({})",
            self.total_matches,
            self.lines_scanned,
            self.chunks.len(),
            humantime::format_duration(self.elapsed)
        )
    }
}
