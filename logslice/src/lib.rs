pub mod config;
pub mod errors;
pub mod extract;
pub mod logging;
pub mod metrics;
pub mod results;

pub use config::{CliOverrides, ExtractConfig, OutputOrder, WriteMode};
pub use errors::{ExtractError, ExtractResult};
pub use extract::{extract, extract_with_cancel, CancellationToken};
pub use results::{ChunkReport, ChunkStatus, ExtractSummary};
