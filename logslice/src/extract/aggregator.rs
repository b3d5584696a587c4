use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::OutputOrder;
use crate::errors::{ExtractError, ExtractResult};

/// Serializes chunk flushes from concurrent scanners into one writer.
///
/// One flush is the unit of atomicity: a flush holds the lock for all of its
/// lines, so output from two chunks never interleaves.
#[derive(Debug)]
pub struct Aggregator<W: Write> {
    state: Mutex<AggregatorState<W>>,
    order: OutputOrder,
    target: PathBuf,
}

#[derive(Debug)]
struct AggregatorState<W> {
    writer: W,
    /// Next chunk index to write in `OutputOrder::File`
    next_index: usize,
    /// Out-of-order chunks waiting for their predecessors
    pending: BTreeMap<usize, Vec<Vec<u8>>>,
    lines_written: u64,
    /// Set after the first write error; later flushes fail fast
    failure: Option<String>,
}

impl<W: Write> Aggregator<W> {
    /// `target` names the destination in error messages
    pub fn new(writer: W, order: OutputOrder, target: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(AggregatorState {
                writer,
                next_index: 0,
                pending: BTreeMap::new(),
                lines_written: 0,
                failure: None,
            }),
            order,
            target: target.into(),
        }
    }

    pub fn order(&self) -> OutputOrder {
        self.order
    }

    fn lock(&self) -> ExtractResult<MutexGuard<'_, AggregatorState<W>>> {
        self.state
            .lock()
            .map_err(|_| ExtractError::output_unwritable(&self.target, "output lock poisoned"))
    }

    /// Hands one chunk's matches to the output. Safe to call from many threads.
    ///
    /// A failed chunk should still be flushed with an empty batch so that
    /// file-ordered output can advance past it.
    pub fn flush(&self, chunk_index: usize, lines: Vec<Vec<u8>>) -> ExtractResult<()> {
        let mut state = self.lock()?;
        if let Some(reason) = &state.failure {
            return Err(ExtractError::output_unwritable(&self.target, reason));
        }

        let result = match self.order {
            OutputOrder::Completion => state.write_batch(&lines),
            OutputOrder::File => {
                state.pending.insert(chunk_index, lines);
                state.drain_ready()
            }
        };

        result.map_err(|e| {
            state.failure = Some(e.to_string());
            ExtractError::output_unwritable(&self.target, e)
        })
    }

    /// Writes whatever is still pending, flushes the writer and returns it
    pub fn finish(self) -> ExtractResult<(W, u64)> {
        let target = self.target;
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| ExtractError::output_unwritable(&target, "output lock poisoned"))?;
        if let Some(reason) = state.failure.take() {
            return Err(ExtractError::output_unwritable(&target, reason));
        }

        // Only reachable if a chunk index was never flushed
        let leftovers = std::mem::take(&mut state.pending);
        if !leftovers.is_empty() {
            debug!("Writing {} chunks left pending at finish", leftovers.len());
        }
        for lines in leftovers.values() {
            state
                .write_batch(lines)
                .map_err(|e| ExtractError::output_unwritable(&target, e))?;
        }
        state
            .writer
            .flush()
            .map_err(|e| ExtractError::output_unwritable(&target, e))?;

        Ok((state.writer, state.lines_written))
    }
}

impl<W: Write> AggregatorState<W> {
    fn write_batch(&mut self, lines: &[Vec<u8>]) -> std::io::Result<()> {
        for line in lines {
            self.writer.write_all(line)?;
            self.writer.write_all(b"\n")?;
        }
        self.lines_written += lines.len() as u64;
        Ok(())
    }

    fn drain_ready(&mut self) -> std::io::Result<()> {
        while let Some(lines) = self.pending.remove(&self.next_index) {
            self.write_batch(&lines)?;
            self.next_index += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use std::thread;

    fn batch(chunk: usize, count: usize) -> Vec<Vec<u8>> {
        (0..count)
            .map(|i| format!("chunk{}-line{}", chunk, i).into_bytes())
            .collect()
    }

    fn output_lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_file_order_reorders_late_chunks() {
        let aggregator = Aggregator::new(Vec::new(), OutputOrder::File, "mem");
        aggregator.flush(2, batch(2, 1)).unwrap();
        aggregator.flush(0, batch(0, 2)).unwrap();
        aggregator.flush(1, Vec::new()).unwrap();

        let (bytes, written) = aggregator.finish().unwrap();
        assert_eq!(written, 3);
        assert_eq!(
            output_lines(&bytes),
            vec!["chunk0-line0", "chunk0-line1", "chunk2-line0"]
        );
    }

    #[test]
    fn test_completion_order_writes_on_arrival() {
        let aggregator = Aggregator::new(Vec::new(), OutputOrder::Completion, "mem");
        aggregator.flush(1, batch(1, 1)).unwrap();
        aggregator.flush(0, batch(0, 1)).unwrap();

        let (bytes, _) = aggregator.finish().unwrap();
        assert_eq!(output_lines(&bytes), vec!["chunk1-line0", "chunk0-line0"]);
    }

    #[test]
    fn test_finish_writes_leftovers_in_index_order() {
        let aggregator = Aggregator::new(Vec::new(), OutputOrder::File, "mem");
        aggregator.flush(3, batch(3, 1)).unwrap();
        aggregator.flush(1, batch(1, 1)).unwrap();

        let (bytes, _) = aggregator.finish().unwrap();
        assert_eq!(output_lines(&bytes), vec!["chunk1-line0", "chunk3-line0"]);
    }

    #[test]
    fn test_concurrent_flushes_do_not_interleave() {
        for order in [OutputOrder::File, OutputOrder::Completion] {
            let aggregator = Arc::new(Aggregator::new(Vec::new(), order, "mem"));

            let handles: Vec<_> = (0..16)
                .map(|chunk| {
                    let aggregator = Arc::clone(&aggregator);
                    thread::spawn(move || aggregator.flush(chunk, batch(chunk, 200)).unwrap())
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let aggregator = Arc::try_unwrap(aggregator).unwrap();
            let (bytes, written) = aggregator.finish().unwrap();
            assert_eq!(written, 16 * 200);

            // Each chunk's lines form one contiguous, ordered run
            let lines = output_lines(&bytes);
            for run in lines.chunks(200) {
                let chunk = run[0].split('-').next().unwrap().to_string();
                for (i, line) in run.iter().enumerate() {
                    assert_eq!(line, &format!("{}-line{}", chunk, i));
                }
            }
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_poisons_aggregator() {
        let aggregator = Aggregator::new(BrokenWriter, OutputOrder::Completion, "out.txt");

        let first = aggregator.flush(0, batch(0, 1));
        assert!(matches!(first, Err(ExtractError::OutputUnwritable { .. })));

        // Empty batches write nothing but still observe the failure
        let second = aggregator.flush(1, Vec::new());
        assert!(matches!(second, Err(ExtractError::OutputUnwritable { .. })));
        assert!(aggregator.finish().is_err());
    }
}
