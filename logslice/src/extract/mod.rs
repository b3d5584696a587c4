//! Parallel, line-aligned extraction of prefixed lines from one large log.
//!
//! # How a run works
//!
//! 1. **Planning**: [`plan`] cuts the source into one byte range per worker and
//!    moves every cut forward to the next line start, so ranges stay contiguous
//!    and no line is split between two workers.
//! 2. **Scanning**: each [`ChunkScanner`] opens its own handle on the source,
//!    seeks to its range and reads lines until it passes the range end. A line
//!    belongs to the chunk containing its first byte.
//! 3. **Aggregation**: scanners hand their matches to the [`Aggregator`] in one
//!    flush each. The aggregator holds a single lock per flush, so chunks never
//!    interleave in the output.
//!
//! ```rust,ignore
//! let source = FileSource::open_path("server.log")?;
//! let matcher = PrefixMatcher::new("2024-01-01");
//! let run = ChunkedExtractor::new(NonZeroUsize::new(8).unwrap())
//!     .run(&source, &matcher, Vec::new(), Path::new("memory"))?;
//! ```
//!
//! # Concurrency
//!
//! The [`ChunkedExtractor`] builds a `rayon` pool with exactly one thread per
//! chunk and spawns every scanner inside a single `scope`, which joins them all
//! before returning. Workers only block on reads and on the aggregator lock.
//!
//! # Failure isolation
//!
//! A scanner that cannot read its range reports a failed chunk and contributes
//! no lines; its siblings keep going. Output errors and cancellation fail the
//! whole run.
pub mod aggregator;
pub mod cancel;
pub mod engine;
pub mod matcher;
pub mod planner;
pub mod scanner;
pub mod source;

pub use aggregator::Aggregator;
pub use cancel::CancellationToken;
pub use engine::{extract, extract_with_cancel, open_output, ChunkedExtractor, ExtractRun};
pub use matcher::PrefixMatcher;
pub use planner::{align_to_line_start, plan, planned_ranges, ChunkRange};
pub use scanner::{ChunkMatches, ChunkScanner};
pub use source::{FileSource, LogSource, MemorySource};
