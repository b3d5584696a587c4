use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use logslice::{
    config::{parse_worker_count, CliOverrides, ExtractConfig, OutputOrder, WriteMode},
    extract,
    logging::init_tracing,
    ChunkStatus, ExtractSummary,
};
use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "logslice",
    author,
    version,
    about = "Extract every log line starting with a date, scanning the file in parallel chunks",
    long_about = None,
    allow_negative_numbers = true
)]
struct Cli {
    /// Path to the log file to scan
    log_file: PathBuf,

    /// Prefix lines must start with, e.g. 2024-01-01
    date: String,

    /// Number of chunks scanned concurrently
    worker_count: i64,

    /// Directory the output file is written to (default: output)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Replace the output file instead of appending to it
    #[arg(long)]
    truncate: bool,

    /// Cross-chunk output order (file|completion)
    #[arg(long)]
    order: Option<String>,

    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print match and timing statistics after the run
    #[arg(short, long)]
    stats: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(summary) => ExitCode::from(exit_status(&summary)),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExtractSummary> {
    // Argument checks happen before touching the filesystem
    let worker_count = parse_worker_count(cli.worker_count)?;
    let output_order = cli
        .order
        .as_deref()
        .map(str::parse::<OutputOrder>)
        .transpose()?;

    let overrides = CliOverrides {
        output_dir: cli.output_dir,
        write_mode: cli.truncate.then_some(WriteMode::Truncate),
        output_order,
        log_level: cli.log_level,
        ..CliOverrides::new(cli.log_file, cli.date, worker_count)
    };

    let config = ExtractConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(overrides);
    config.validate()?;

    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let summary = extract(&config)?;
    write_summary(&summary, cli.stats, &mut io::stdout(), &mut io::stderr())
        .context("failed to print summary")?;
    Ok(summary)
}

/// Process exit status for a finished run: non-zero when any chunk failed
fn exit_status(summary: &ExtractSummary) -> u8 {
    if summary.is_complete() {
        0
    } else {
        1
    }
}

fn write_summary(
    summary: &ExtractSummary,
    stats: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    for chunk in summary.failed_chunks() {
        if let ChunkStatus::Failed(reason) = &chunk.status {
            writeln!(
                err,
                "{} chunk {} {} was not scanned: {}",
                "warning:".yellow(),
                chunk.index,
                chunk.range,
                reason
            )?;
        }
    }

    writeln!(
        out,
        "Logs for {} extracted to {}",
        summary.prefix,
        summary.output_path.display()
    )?;

    if stats {
        writeln!(out, "{}", summary.stats_line())?;
    }
    if !summary.is_complete() {
        writeln!(
            err,
            "{} {} of {} chunks failed; output is incomplete",
            "warning:".yellow(),
            summary.failed_chunks().count(),
            summary.chunks.len()
        )?;
    }
    Ok(())
}
