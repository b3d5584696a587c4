use std::io::{BufRead, Seek, SeekFrom};
use tracing::trace;

use super::cancel::CancellationToken;
use super::matcher::PrefixMatcher;
use super::planner::ChunkRange;
use super::source::LogSource;
use crate::errors::{ExtractError, ExtractResult};

/// Matched lines from one chunk, in source order, without their `\n` terminators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMatches {
    pub lines: Vec<Vec<u8>>,
    pub lines_read: u64,
    pub bytes_read: u64,
}

/// Scans one chunk range of a source
#[derive(Debug, Clone)]
pub struct ChunkScanner<'a> {
    matcher: &'a PrefixMatcher,
    cancel: &'a CancellationToken,
}

impl<'a> ChunkScanner<'a> {
    pub fn new(matcher: &'a PrefixMatcher, cancel: &'a CancellationToken) -> Self {
        Self { matcher, cancel }
    }

    /// Opens an independent handle on `source` and scans `range`.
    ///
    /// The handle is dropped before returning on every path.
    pub fn scan<S: LogSource>(&self, source: &S, range: ChunkRange) -> ExtractResult<ChunkMatches> {
        if range.is_empty() {
            return Ok(ChunkMatches::default());
        }
        let mut reader = source.open()?;
        self.scan_reader(&mut reader, range)
    }

    /// Reads every line whose first byte lies in `range`, finishing the last one
    /// even if it runs past `range.end`.
    pub fn scan_reader<R: BufRead + Seek>(
        &self,
        reader: &mut R,
        range: ChunkRange,
    ) -> ExtractResult<ChunkMatches> {
        let mut result = ChunkMatches::default();
        if range.is_empty() {
            return Ok(result);
        }

        reader.seek(SeekFrom::Start(range.start))?;
        let mut position = range.start;
        let mut line = Vec::with_capacity(256);

        while position < range.end {
            if self.cancel.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }

            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            position += read as u64;
            result.lines_read += 1;
            result.bytes_read += read as u64;

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if self.matcher.is_match(&line) {
                result.lines.push(line.clone());
            }
        }

        trace!(
            "Scanned {} lines in {}, {} matched",
            result.lines_read,
            range,
            result.lines.len()
        );
        Ok(result)
    }
}
