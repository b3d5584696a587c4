use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{ExtractError, ExtractResult};

const BUFFER_CAPACITY: usize = 65536;

/// A seekable, read-only log that hands out independent read handles.
///
/// Every call to [`LogSource::open`] must return a handle with its own cursor;
/// scanners never share one.
pub trait LogSource: Sync {
    type Reader: BufRead + Seek;

    /// Total length in bytes, fixed for the duration of a run
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a fresh handle positioned at offset 0
    fn open(&self) -> ExtractResult<Self::Reader>;

    /// Human-readable name used in logs and errors
    fn describe(&self) -> String;
}

/// A log file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    /// Opens the file once to capture its length
    pub fn open_path(path: impl AsRef<Path>) -> ExtractResult<Self> {
        let path = path.as_ref();
        let metadata = File::open(path)
            .and_then(|f| f.metadata())
            .map_err(|e| ExtractError::unreadable(path, e))?;
        if metadata.is_dir() {
            return Err(ExtractError::unreadable(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSource for FileSource {
    type Reader = BufReader<File>;

    fn len(&self) -> u64 {
        self.len
    }

    fn open(&self) -> ExtractResult<Self::Reader> {
        let file = File::open(&self.path).map_err(|e| ExtractError::unreadable(&self.path, e))?;
        Ok(BufReader::with_capacity(BUFFER_CAPACITY, file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-memory log, mostly useful for tests and benchmarks
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::from(data.into()),
        }
    }
}

impl LogSource for MemorySource {
    type Reader = Cursor<Arc<[u8]>>;

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn open(&self) -> ExtractResult<Self::Reader> {
        Ok(Cursor::new(Arc::clone(&self.data)))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.data.len())
    }
}
