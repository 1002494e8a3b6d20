//! Background replacement CLI tool
//!
//! Runs the pipeline over files and directories, shows chunk progress and
//! prints a summary (human-readable or JSON).

use super::config::CliConfigBuilder;
use crate::{
    pipeline::{BatchSummary, PipelineController},
    tracing_config::{spans, TracingConfig, TracingFormat},
    types::{PipelineResult, ProcessOptions, ProjectContext},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Instrument;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "tif"];

/// Background replacement with subject-integrity QA
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgswap")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output directory for masks, edited images and forensic logs
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// JSON configuration file (flags override its values)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Background replacement strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<CliStrategy>,

    /// Style reference image (style-reference strategy)
    #[arg(long, value_name = "FILE")]
    pub style_reference: Option<PathBuf>,

    /// Skip QA validation (edited images are marked safe without verification)
    #[arg(long)]
    pub skip_qa: bool,

    /// Images processed concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Timeout for each remote call in seconds (1-600)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// SSIM threshold for a passing verdict (0.0-1.0)
    #[arg(long)]
    pub ssim_threshold: Option<f64>,

    /// Environment variable holding the API bearer token
    #[arg(long, value_name = "VAR")]
    pub api_key_env: Option<String>,

    /// Item category used in the generation prompt
    #[arg(long)]
    pub category: Option<String>,

    /// Requested background style
    #[arg(long)]
    pub background: Option<String>,

    /// Extra prompt hints (repeatable)
    #[arg(long = "hint")]
    pub hints: Vec<String>,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Filename pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero unless every image is safe to publish
    #[arg(long)]
    pub require_safe: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliStrategy {
    Inpaint,
    FixedOutpaint,
    AdaptiveOutpaint,
    StyleReference,
}

/// Machine-readable batch report
#[derive(Debug, Serialize)]
struct BatchReport<'a> {
    summary: &'a BatchSummary,
    results: &'a [PipelineResult],
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = uuid::Uuid::new_v4().to_string();
    let _guard = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(TracingFormat::Console)
        .with_session_id(session_id.clone())
        .init()
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let concurrency = config.concurrency;
    info!("Strategy: {}, concurrency: {}", config.strategy, concurrency);

    let files = collect_input_files(&cli)?;
    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }
    info!("Found {} image file(s) to process", files.len());

    let context = ProjectContext {
        project_id: None,
        category: cli.category.clone(),
        background_style: cli.background.clone(),
        hints: cli.hints.clone(),
    };
    let controller =
        PipelineController::from_config(config).context("Failed to create pipeline")?;
    let options = ProcessOptions {
        skip_qa: cli.skip_qa,
    };

    let progress = if cli.json || files.len() < 2 {
        None
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let start_time = Instant::now();
    let results = controller
        .process_files_with_progress(&files, &context, options, concurrency, |done, _total| {
            if let Some(pb) = &progress {
                pb.set_position(done as u64);
            }
        })
        .instrument(spans::batch_processing(&session_id, files.len(), concurrency))
        .await;
    if let Some(pb) = &progress {
        pb.finish_with_message("done");
    }

    let summary = BatchSummary::from_results(&results);
    if cli.json {
        let report = BatchReport {
            summary: &summary,
            results: &results,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_results(&results, &summary, start_time.elapsed().as_secs_f64());
    }

    if !summary.all_succeeded() {
        anyhow::bail!("{} of {} image(s) failed", summary.failed, summary.total);
    }
    if cli.require_safe && !summary.all_safe() {
        anyhow::bail!(
            "{} of {} image(s) are not safe to publish",
            summary.total - summary.safe,
            summary.total
        );
    }
    Ok(())
}

fn print_results(results: &[PipelineResult], summary: &BatchSummary, seconds: f64) {
    for result in results {
        match (&result.error, result.forensic_log.as_ref()) {
            (Some(error), _) => println!("✗ {}: {}", result.input_name, error),
            (None, Some(log)) => println!(
                "{} {}: qa {} (ssim {:.4}){}",
                if log.vinted_safe { "✓" } else { "!" },
                result.input_name,
                log.qa_output.qa_status,
                log.qa_output.ssim_score,
                result
                    .artifacts
                    .edited
                    .as_ref()
                    .map(|p| format!(" -> {}", p.display()))
                    .unwrap_or_default()
            ),
            (None, None) => println!("? {}: no forensic log", result.input_name),
        }
    }
    println!(
        "Processed {} image(s) in {:.2}s: {} succeeded, {} failed; QA {} passed, {} failed, {} skipped; est. cost ${:.3}",
        summary.total,
        seconds,
        summary.succeeded,
        summary.failed,
        summary.qa_passed,
        summary.qa_failed,
        summary.qa_skipped,
        summary.total_cost_usd
    );
}

/// Expand file and directory inputs into a sorted file list
fn collect_input_files(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();
    for input in &cli.input {
        let path = PathBuf::from(input);
        if path.is_file() {
            if is_image_file(&path, IMAGE_EXTENSIONS) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, cli.recursive, cli.pattern.as_deref())?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }
    all_files.sort();
    all_files.dedup();
    Ok(all_files)
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if is_image_file(path, IMAGE_EXTENSIONS) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if is_image_file(&path, IMAGE_EXTENSIONS) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Check if file is an image based on extension
fn is_image_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext.to_lowercase().as_str()))
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}
