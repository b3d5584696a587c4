use std::fmt;
use std::io::{BufRead, Seek, SeekFrom};
use std::num::NonZeroUsize;
use tracing::{debug, trace};

use super::source::LogSource;
use crate::errors::ExtractResult;

/// A half-open byte range `[start, end)` of the source assigned to one scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Splits `len` bytes into `workers` equal cut points, the last range absorbing
/// the remainder. No line alignment is applied.
pub fn planned_ranges(len: u64, workers: NonZeroUsize) -> Vec<ChunkRange> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.get() as u64;
    let base_size = len / workers;

    (0..workers)
        .map(|i| {
            let start = i * base_size;
            let end = if i == workers - 1 {
                len
            } else {
                (i + 1) * base_size
            };
            ChunkRange::new(start, end)
        })
        .collect()
}

/// Moves `offset` forward to the start of the first full line at or after it.
///
/// An offset that already sits on a line start is returned unchanged. If no
/// line terminator follows, the result is `len`.
pub fn align_to_line_start<R: BufRead + Seek>(
    reader: &mut R,
    offset: u64,
    len: u64,
) -> ExtractResult<u64> {
    if offset == 0 || offset >= len {
        return Ok(offset.min(len));
    }

    // Start one byte early so a cut right after '\n' is detected as a line start
    reader.seek(SeekFrom::Start(offset - 1))?;
    let mut position = offset - 1;
    let aligned = loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break len;
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                break position + i as u64 + 1;
            }
            None => {
                let skipped = buf.len();
                reader.consume(skipped);
                position += skipped as u64;
            }
        }
    };

    trace!("Aligned cut point {} to {}", offset, aligned);
    Ok(aligned.min(len))
}

/// Plans `workers` contiguous, line-aligned ranges covering the whole source.
///
/// An empty source yields no ranges. When there are more workers than lines,
/// some of the returned ranges are empty.
pub fn plan<S: LogSource>(source: &S, workers: NonZeroUsize) -> ExtractResult<Vec<ChunkRange>> {
    let len = source.len();
    let planned = planned_ranges(len, workers);
    if planned.is_empty() {
        debug!("Source {} is empty, nothing to plan", source.describe());
        return Ok(planned);
    }

    let mut reader = source.open()?;
    let mut starts = Vec::with_capacity(planned.len());
    starts.push(0);
    for range in &planned[1..] {
        let aligned = align_to_line_start(&mut reader, range.start, len)?;
        // Alignment is monotone, but keep the invariant explicit
        let previous = starts.last().copied().unwrap_or(0);
        starts.push(aligned.max(previous));
    }

    let ranges: Vec<ChunkRange> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(len);
            ChunkRange::new(start, end)
        })
        .collect();

    debug!(
        "Planned {} chunks over {} bytes of {}",
        ranges.len(),
        len,
        source.describe()
    );
    Ok(ranges)
}
