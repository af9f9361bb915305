use super::glob_util::expand_file_pattern;
use crate::config::Config;
use crate::loader::{truncate, LoadSummary, Loader};
use crate::parser::parse_inserts;
use crate::sink::{RestSink, Sink};
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Per-file outcome.
#[derive(Debug, Default)]
struct FileReport {
    statements: usize,
    parsed: usize,
    skipped: usize,
    summary: LoadSummary,
}

pub fn run(
    file: PathBuf,
    table: Option<String>,
    batch_size: NonZeroUsize,
    progress: bool,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let files = expand_file_pattern(&file)?;
    let config = Config::from_env()?;
    let mut sink = RestSink::new(&config)?;

    println!("{}", "=".repeat(70));
    println!("Project: {}", config.project_ref());
    println!("API URL: {}", config.api_url);
    println!("Files:   {}", files.len());
    println!("{}", "=".repeat(70));
    println!();

    let start_time = Instant::now();
    let mut totals = LoadSummary::default();
    let mut skipped = 0;

    for (i, path) in files.iter().enumerate() {
        println!("[{}/{}] {}", i + 1, files.len(), display_name(path));

        match load_file(&mut sink, path, table.as_deref(), batch_size, progress) {
            Ok(report) => {
                if report.parsed == 0 {
                    println!("  [WARN] No rows found to insert");
                }
                if report.summary.succeeded > 0 {
                    println!("  ✓ Inserted {} rows", report.summary.succeeded);
                }
                if report.summary.failed > 0 {
                    println!("  ✗ {} errors", report.summary.failed);
                }
                totals += report.summary;
                skipped += report.skipped;
            }
            Err(e) => {
                println!(
                    "  [ERROR] Failed to process file: {}",
                    truncate(&format!("{e:#}"), 200)
                );
                totals.failed += 1;
                if fail_fast {
                    anyhow::bail!("stopping after failure in {}", path.display());
                }
            }
        }
        println!();
    }

    println!("{}", "=".repeat(70));
    println!(
        "Summary: {} inserted, {} errors, {} skipped tuples ({:.3?})",
        totals.succeeded,
        totals.failed,
        skipped,
        start_time.elapsed()
    );
    println!("{}", "=".repeat(70));
    println!();

    if totals.succeeded == 0 {
        print_manual_fallback(&config, &files);
    } else if totals.failed > 0 {
        tracing::warn!(errors = totals.failed, "Some rows were not inserted");
    }

    Ok(())
}

fn load_file<S: Sink>(
    sink: &mut S,
    path: &Path,
    table_override: Option<&str>,
    batch_size: NonZeroUsize,
    progress: bool,
) -> anyhow::Result<FileReport> {
    let sql = std::fs::read_to_string(path)?;
    let statements = parse_inserts(&sql);
    let mut report = FileReport {
        statements: statements.len(),
        ..FileReport::default()
    };

    for statement in &statements {
        let table = table_override.unwrap_or(&statement.table);
        report.parsed += statement.records.len();
        report.skipped += statement.skipped;

        println!(
            "  Parsed {} rows for {}{}",
            statement.records.len(),
            table,
            if statement.skipped > 0 {
                format!(" ({} malformed tuples skipped)", statement.skipped)
            } else {
                String::new()
            }
        );
        if statement.records.is_empty() {
            continue;
        }

        let mut loader = Loader::new().with_batch_size(batch_size);
        let pb = progress.then(|| batch_progress_bar(statement.records.len() as u64));
        if let Some(ref pb) = pb {
            let pb_clone = pb.clone();
            loader = loader.with_progress(move |done, _| pb_clone.set_position(done as u64));
        }

        report.summary += loader.load(sink, table, &statement.records);

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
    }

    tracing::info!(
        file = %path.display(),
        statements = report.statements,
        parsed = report.parsed,
        skipped = report.skipped,
        succeeded = report.summary.succeeded,
        failed = report.summary.failed,
        "File processed"
    );
    Ok(report)
}

fn batch_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows",
    ) {
        pb.set_style(
            style
                .progress_chars("█▓▒░  ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn print_manual_fallback(config: &Config, files: &[PathBuf]) {
    println!("⚠️  No rows inserted. Check errors above.");
    println!();
    println!("Alternative: apply the migrations in the dashboard SQL editor");
    println!("  1. Open: {}", config.dashboard_sql_url());
    println!("  2. Paste each file in order:");
    for (i, f) in files.iter().enumerate() {
        println!("     {}. {}", i + 1, display_name(f));
    }
    println!("  3. Click 'Run' after each file");
    println!();
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
