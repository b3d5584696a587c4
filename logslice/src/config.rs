use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{ExtractError, ExtractResult};

/// Configuration for an extraction run.
///
/// # Configuration Locations
///
/// Values are layered from these locations, later ones taking precedence:
/// 1. Global `$HOME/.config/logslice/config.yaml`
/// 2. Local `.logslice.yaml` in the current directory
/// 3. Custom config file given via `--config`
///
/// Command-line arguments are merged on top with [`ExtractConfig::merge_with_cli`].
/// The CLI always passes a worker count, so `worker_count` from a file only
/// takes effect for library callers that use [`ExtractConfig::load_from`]
/// directly.
///
/// # Configuration Format
///
/// ```yaml
/// # Directory the output file is written to
/// output_dir: "output"
///
/// # append | truncate
/// write_mode: append
///
/// # file | completion
/// output_order: file
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Path to the log file to scan
    #[serde(default)]
    pub log_path: PathBuf,

    /// Literal prefix a line must start with, usually a date such as `2024-01-01`
    #[serde(default)]
    pub prefix: String,

    /// Number of chunks, and therefore concurrent scanners
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Directory holding `output_<prefix>.txt`
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether an existing output file is appended to or replaced
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Order in which chunk results reach the output
    #[serde(default)]
    pub output_order: OutputOrder,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How the output file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Repeated runs accumulate lines
    #[default]
    Append,
    /// Each run starts from an empty file
    Truncate,
}

/// Cross-chunk ordering of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputOrder {
    /// Chunks are written in chunk-index order, matching the source
    #[default]
    File,
    /// Chunks are written as soon as their scanner finishes
    Completion,
}

impl std::str::FromStr for OutputOrder {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "completion" => Ok(Self::Completion),
            other => Err(ExtractError::config_error(format!(
                "unknown output order '{}' (expected file or completion)",
                other
            ))),
        }
    }
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::new(),
            prefix: String::new(),
            worker_count: default_worker_count(),
            output_dir: default_output_dir(),
            write_mode: WriteMode::default(),
            output_order: OutputOrder::default(),
            log_level: default_log_level(),
        }
    }
}

/// Values taken from the command line.
///
/// The optional fields are `None` when the matching flag was not passed, so an
/// explicit value equal to the built-in default still overrides the file.
#[derive(Debug, Clone)]
pub struct CliOverrides {
    pub log_path: PathBuf,
    pub prefix: String,
    pub worker_count: NonZeroUsize,
    pub output_dir: Option<PathBuf>,
    pub write_mode: Option<WriteMode>,
    pub output_order: Option<OutputOrder>,
    pub log_level: Option<String>,
}

impl CliOverrides {
    pub fn new(
        log_path: impl Into<PathBuf>,
        prefix: impl Into<String>,
        worker_count: NonZeroUsize,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            prefix: prefix.into(),
            worker_count,
            output_dir: None,
            write_mode: None,
            output_order: None,
            log_level: None,
        }
    }
}

/// Converts a raw worker count into a usable one, rejecting zero and negatives
pub fn parse_worker_count(raw: i64) -> ExtractResult<NonZeroUsize> {
    usize::try_from(raw)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(ExtractError::InvalidWorkerCount(raw))
}

impl ExtractConfig {
    /// Creates a config for the given log and prefix with default settings
    pub fn new(
        log_path: impl Into<PathBuf>,
        prefix: impl Into<String>,
        worker_count: NonZeroUsize,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            prefix: prefix.into(),
            worker_count,
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> ExtractResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> ExtractResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("logslice/config.yaml")),
            Some(PathBuf::from(".logslice.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Positional arguments always replace the file values; optional flags
    /// replace them only when they were given.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        self.log_path = cli.log_path;
        self.prefix = cli.prefix;
        self.worker_count = cli.worker_count;

        if let Some(dir) = cli.output_dir {
            self.output_dir = dir;
        }
        if let Some(mode) = cli.write_mode {
            self.write_mode = mode;
        }
        if let Some(order) = cli.output_order {
            self.output_order = order;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Checks the values that cannot be expressed in the type system
    pub fn validate(&self) -> ExtractResult<()> {
        if self.prefix.is_empty() {
            return Err(ExtractError::config_error("date prefix must not be empty"));
        }
        if self.prefix.contains(['/', '\\']) || self.prefix == "." || self.prefix == ".." {
            return Err(ExtractError::config_error(format!(
                "date prefix '{}' cannot be used in an output file name",
                self.prefix
            )));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(ExtractError::config_error("log file path must not be empty"));
        }
        Ok(())
    }

    /// Path of the output file, `<output_dir>/output_<prefix>.txt`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("output_{}.txt", self.prefix))
    }
}
