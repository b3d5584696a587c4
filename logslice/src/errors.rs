/// Error types for log extraction.
///
/// Failures fall into three groups:
///
/// 1. **Source errors**: the log file cannot be opened or read. A failure while
///    planning is fatal; a failure inside a single chunk scanner is isolated and
///    recorded in that chunk's report.
/// 2. **Configuration errors**: bad worker counts, unusable prefixes, or a
///    malformed config file. These are raised before any I/O happens.
/// 3. **Output errors**: the output directory or file cannot be created or
///    written. These are always fatal.
///
/// ```rust,ignore
/// match extract(&config) {
///     Ok(summary) => println!("{} matches", summary.total_matches),
///     Err(ExtractError::FileNotFound(path)) => eprintln!("no such log: {}", path.display()),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors that can occur while extracting log lines
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Unable to read log file {path}: {source}")]
    SourceUnreadable { path: PathBuf, source: io::Error },
    #[error("Unable to write output {path}: {reason}")]
    OutputUnwritable { path: PathBuf, reason: String },
    #[error("Invalid worker count: {0} (must be a positive integer)")]
    InvalidWorkerCount(i64),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
    #[error("Extraction cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl ExtractError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Classifies an I/O error raised while opening or reading the source
    pub fn unreadable(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::file_not_found(path),
            io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::SourceUnreadable {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn output_unwritable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::OutputUnwritable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this error only affects the chunk that raised it
    pub fn is_isolated(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::PermissionDenied(_)
                | Self::SourceUnreadable { .. }
                | Self::IoError(_)
        )
    }
}

impl From<config::ConfigError> for ExtractError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
