use rayon::ThreadPoolBuilder;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::aggregator::Aggregator;
use super::cancel::CancellationToken;
use super::matcher::PrefixMatcher;
use super::planner::{plan, ChunkRange};
use super::scanner::ChunkScanner;
use super::source::{FileSource, LogSource};
use crate::config::{ExtractConfig, OutputOrder, WriteMode};
use crate::errors::{ExtractError, ExtractResult};
use crate::metrics::ScanMetrics;
use crate::results::{ChunkReport, ExtractSummary};

/// What a finished run hands back besides the per-chunk reports
pub struct ExtractRun<W> {
    /// Reports in chunk-index order
    pub chunks: Vec<ChunkReport>,
    /// The flushed output writer
    pub writer: W,
    pub lines_written: u64,
}

/// Runs one scanner per planned chunk on a fixed pool and joins them all
#[derive(Debug, Clone)]
pub struct ChunkedExtractor {
    workers: NonZeroUsize,
    order: OutputOrder,
    cancel: CancellationToken,
    metrics: ScanMetrics,
}

impl ChunkedExtractor {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            order: OutputOrder::default(),
            cancel: CancellationToken::new(),
            metrics: ScanMetrics::new(),
        }
    }

    pub fn with_order(mut self, order: OutputOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Plans `source`, scans every chunk concurrently and writes matches to `writer`.
    ///
    /// Scanner read failures are isolated and show up as failed chunk reports.
    /// Output failures and cancellation fail the whole run once every worker
    /// has been joined.
    pub fn run<S, W>(
        &self,
        source: &S,
        matcher: &PrefixMatcher,
        writer: W,
        target: &Path,
    ) -> ExtractResult<ExtractRun<W>>
    where
        S: LogSource,
        W: Write + Send,
    {
        let ranges = plan(source, self.workers)?;
        let aggregator = Aggregator::new(writer, self.order, target);
        let reports = Mutex::new(Vec::with_capacity(ranges.len()));
        let fatal: Mutex<Option<ExtractError>> = Mutex::new(None);

        if !ranges.is_empty() {
            let pool = ThreadPoolBuilder::new()
                .num_threads(ranges.len())
                .thread_name(|i| format!("logslice-scan-{}", i))
                .build()
                .map_err(|e| ExtractError::ThreadPool(e.to_string()))?;
            let scanner = ChunkScanner::new(matcher, &self.cancel);

            pool.scope(|scope| {
                for (index, range) in ranges.iter().copied().enumerate() {
                    let scanner = &scanner;
                    let aggregator = &aggregator;
                    let reports = &reports;
                    let fatal = &fatal;
                    scope.spawn(move |_| {
                        match self.run_chunk(source, scanner, aggregator, index, range) {
                            Ok(report) => {
                                if let Ok(mut reports) = reports.lock() {
                                    reports.push(report);
                                }
                            }
                            Err(err) => {
                                if let Ok(mut slot) = fatal.lock() {
                                    slot.get_or_insert(err);
                                }
                            }
                        }
                    });
                }
            });
        }

        let fatal = fatal.into_inner().unwrap_or_else(|p| p.into_inner());
        if let Some(err) = fatal {
            return Err(err);
        }
        if self.cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let (writer, lines_written) = aggregator.finish()?;
        let mut chunks = reports.into_inner().unwrap_or_else(|p| p.into_inner());
        chunks.sort_by_key(|report| report.index);

        Ok(ExtractRun {
            chunks,
            writer,
            lines_written,
        })
    }

    fn run_chunk<S, W>(
        &self,
        source: &S,
        scanner: &ChunkScanner<'_>,
        aggregator: &Aggregator<W>,
        index: usize,
        range: ChunkRange,
    ) -> ExtractResult<ChunkReport>
    where
        S: LogSource,
        W: Write,
    {
        match scanner.scan(source, range) {
            Ok(found) => {
                let matches = found.lines.len() as u64;
                aggregator.flush(index, found.lines)?;
                self.metrics
                    .record_chunk(found.bytes_read, found.lines_read, matches);
                debug!(
                    "Chunk {} {} done: {} lines read, {} matched",
                    index, range, found.lines_read, matches
                );
                Ok(ChunkReport::completed(
                    index,
                    range,
                    found.lines_read,
                    found.bytes_read,
                    matches,
                ))
            }
            Err(err) if err.is_isolated() => {
                warn!(
                    "Chunk {} {} of {} failed: {}",
                    index,
                    range,
                    source.describe(),
                    err
                );
                self.metrics.record_failure();
                // Empty flush keeps file-ordered output moving
                aggregator.flush(index, Vec::new())?;
                Ok(ChunkReport::failed(index, range, err))
            }
            Err(err) => Err(err),
        }
    }
}

/// Creates the parent directory if needed and opens the output file
pub fn open_output(path: &Path, mode: WriteMode) -> ExtractResult<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| ExtractError::output_unwritable(dir, e))?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => {
            options.append(true);
        }
        WriteMode::Truncate => {
            options.write(true).truncate(true);
        }
    }
    options
        .open(path)
        .map_err(|e| ExtractError::output_unwritable(path, e))
}

/// Extracts every line of `config.log_path` starting with `config.prefix`
pub fn extract(config: &ExtractConfig) -> ExtractResult<ExtractSummary> {
    extract_with_cancel(config, CancellationToken::new())
}

/// Like [`extract`], stopping early if `cancel` fires
pub fn extract_with_cancel(
    config: &ExtractConfig,
    cancel: CancellationToken,
) -> ExtractResult<ExtractSummary> {
    config.validate()?;
    let started = Instant::now();
    info!(
        "Extracting lines starting with {:?} from {} using {} workers",
        config.prefix,
        config.log_path.display(),
        config.worker_count
    );

    // Opening the source first keeps a bad path from creating output
    let source = FileSource::open_path(&config.log_path)?;
    let output_path = config.output_path();
    let output = open_output(&output_path, config.write_mode)?;

    let extractor = ChunkedExtractor::new(config.worker_count)
        .with_order(config.output_order)
        .with_cancellation(cancel);
    let matcher = PrefixMatcher::new(&config.prefix);
    let run = extractor.run(&source, &matcher, BufWriter::new(output), &output_path)?;

    let mut summary = ExtractSummary::new(&output_path, &config.prefix, config.worker_count.get());
    for report in run.chunks {
        summary.add_chunk(report);
    }
    summary.elapsed = started.elapsed();

    extractor.metrics().log_stats();
    info!(
        "Extraction complete. Wrote {} lines to {} in {}",
        run.lines_written,
        output_path.display(),
        humantime::format_duration(summary.elapsed)
    );

    Ok(summary)
}
