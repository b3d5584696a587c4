use anyhow::Result;
use logslice::{extract, ExtractConfig, ExtractError, OutputOrder, WriteMode};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_log(dir: &TempDir, name: &str, lines: &[String]) -> Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(path)
}

fn generated_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let day = (i % 7) + 1;
            format!(
                "2024-01-{:02} 12:{:02}:{:02} INFO request {} {}",
                day,
                i % 60,
                (i * 7) % 60,
                i,
                "payload".repeat(i % 5)
            )
        })
        .collect()
}

fn config_for(dir: &TempDir, log: &Path, prefix: &str, workers: usize) -> ExtractConfig {
    let mut config = ExtractConfig::new(log, prefix, NonZeroUsize::new(workers).unwrap());
    config.output_dir = dir.path().join("output");
    config
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::to_string)
        .collect())
}

fn as_set(lines: Vec<String>) -> BTreeSet<String> {
    lines.into_iter().collect()
}

#[test]
fn test_small_file_three_matches() -> Result<()> {
    let dir = tempdir()?;
    let lines: Vec<String> = vec![
        "2024-01-01 08:00:00 boot",
        "2024-01-02 08:00:01 login alice",
        "2024-01-02 08:00:02 login bob",
        "2024-01-01 08:00:03 cron tick",
        "2023-12-31 23:59:59 late entry",
        "2024-01-03 09:00:00 shutdown",
        "2024-01-02 09:10:00 backup",
        "2024-01-01 09:20:00 cron tock",
        "2024-01-04 10:00:00 audit",
        "2024-01-05 11:00:00 idle",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let log = write_log(&dir, "app.log", &lines)?;

    let config = config_for(&dir, &log, "2024-01-01", 4);
    let summary = extract(&config)?;

    let expected_path = dir.path().join("output").join("output_2024-01-01.txt");
    assert_eq!(summary.output_path, expected_path);
    assert_eq!(summary.total_matches, 3);
    assert_eq!(summary.lines_scanned, 10);
    assert!(summary.is_complete());

    let written = read_lines(&expected_path)?;
    assert_eq!(
        written,
        vec![
            "2024-01-01 08:00:00 boot",
            "2024-01-01 08:00:03 cron tick",
            "2024-01-01 09:20:00 cron tock",
        ]
    );
    Ok(())
}

#[test]
fn test_empty_file_creates_empty_output() -> Result<()> {
    let dir = tempdir()?;
    let log = write_log(&dir, "empty.log", &[])?;

    let config = config_for(&dir, &log, "2024-01-01", 5);
    let summary = extract(&config)?;

    assert!(summary.output_path.exists());
    assert_eq!(fs::read_to_string(&summary.output_path)?, "");
    assert_eq!(summary.total_matches, 0);
    assert!(summary.chunks.is_empty());
    Ok(())
}

#[test]
fn test_more_workers_than_lines() -> Result<()> {
    let dir = tempdir()?;
    let lines: Vec<String> = (0..5).map(|i| format!("2024-01-01 line {}", i)).collect();
    let log = write_log(&dir, "tiny.log", &lines)?;

    let config = config_for(&dir, &log, "2024-01-01", 100);
    let summary = extract(&config)?;

    assert_eq!(summary.chunks.len(), 100);
    assert!(summary.is_complete());
    assert!(summary.chunks.iter().filter(|c| c.range.is_empty()).count() >= 95);
    assert_eq!(summary.total_matches, 5);
    assert_eq!(read_lines(&summary.output_path)?, lines);
    Ok(())
}

#[test]
fn test_prefix_overreach_matches() -> Result<()> {
    let dir = tempdir()?;
    let lines: Vec<String> = vec![
        "2024-01-02 foo",
        "2024-01-020 extra",
        "2024-01-2 short",
        " 2024-01-02 indented",
        "2024-01-03 other",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let log = write_log(&dir, "overreach.log", &lines)?;

    let summary = extract(&config_for(&dir, &log, "2024-01-02", 2))?;
    assert_eq!(
        read_lines(&summary.output_path)?,
        vec!["2024-01-02 foo", "2024-01-020 extra"]
    );
    Ok(())
}

#[test]
fn test_worker_counts_agree_on_match_set() -> Result<()> {
    let dir = tempdir()?;
    let lines = generated_lines(2_000);
    let log = write_log(&dir, "big.log", &lines)?;
    let expected: BTreeSet<String> = lines
        .iter()
        .filter(|l| l.starts_with("2024-01-03"))
        .cloned()
        .collect();

    for (workers, order) in [
        (1, OutputOrder::File),
        (64, OutputOrder::Completion),
        (7, OutputOrder::File),
    ] {
        let mut config = config_for(&dir, &log, "2024-01-03", workers);
        config.output_dir = dir.path().join(format!("out-{}", workers));
        config.output_order = order;

        let summary = extract(&config)?;
        let written = read_lines(&summary.output_path)?;
        assert_eq!(written.len(), expected.len(), "{} workers", workers);
        assert_eq!(as_set(written), expected, "{} workers", workers);
    }
    Ok(())
}

#[test]
fn test_file_order_matches_source_order() -> Result<()> {
    let dir = tempdir()?;
    let lines = generated_lines(1_000);
    let log = write_log(&dir, "ordered.log", &lines)?;
    let expected: Vec<String> = lines
        .iter()
        .filter(|l| l.starts_with("2024-01-05"))
        .cloned()
        .collect();

    let mut config = config_for(&dir, &log, "2024-01-05", 16);
    config.output_order = OutputOrder::File;
    let summary = extract(&config)?;

    assert_eq!(read_lines(&summary.output_path)?, expected);
    Ok(())
}

#[test]
fn test_truncate_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let log = write_log(&dir, "repeat.log", &generated_lines(500))?;

    let mut config = config_for(&dir, &log, "2024-01-01", 8);
    config.write_mode = WriteMode::Truncate;
    config.output_order = OutputOrder::Completion;

    let first = as_set(read_lines(&extract(&config)?.output_path)?);
    let second_summary = extract(&config)?;
    let second = read_lines(&second_summary.output_path)?;

    assert_eq!(second.len() as u64, second_summary.total_matches);
    assert_eq!(first, as_set(second));
    Ok(())
}

#[test]
fn test_append_accumulates() -> Result<()> {
    let dir = tempdir()?;
    let log = write_log(&dir, "append.log", &generated_lines(70))?;

    let config = config_for(&dir, &log, "2024-01-02", 3);
    let first = extract(&config)?;
    extract(&config)?;

    let written = read_lines(&first.output_path)?;
    assert_eq!(written.len() as u64, first.total_matches * 2);
    Ok(())
}

#[test]
fn test_missing_source_is_fatal() -> Result<()> {
    let dir = tempdir()?;
    let config = config_for(&dir, &dir.path().join("nope.log"), "2024-01-01", 2);

    let result = extract(&config);
    assert!(matches!(result, Err(ExtractError::FileNotFound(_))));
    // Nothing is created for a run that never started
    assert!(!dir.path().join("output").exists());
    Ok(())
}

#[test]
fn test_file_without_trailing_newline() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("tail.log");
    fs::write(&log, "2024-01-01 a\n2024-01-02 b\n2024-01-01 c")?;

    let summary = extract(&config_for(&dir, &log, "2024-01-01", 3))?;
    assert_eq!(
        read_lines(&summary.output_path)?,
        vec!["2024-01-01 a", "2024-01-01 c"]
    );
    Ok(())
}
