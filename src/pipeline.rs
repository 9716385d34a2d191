//! Profiling run orchestration.
//!
//! One run is strictly sequential: parse the bytes, profile every column,
//! derive insights, write the report. Each run owns a private scratch
//! directory for chart artifacts; the directory is removed on every exit
//! path, so a failed run leaves nothing behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use log::info;

use crate::chart::{self, ChartRenderer};
use crate::dataset::Table;
use crate::error::ProfileError;
use crate::insight::{self, InsightSet};
use crate::parse;
use crate::profile::{self, AnalyzerOptions, ColumnProfile};
use crate::report;

/// All tunables for one profiling run. Defaults mirror the per-module
/// constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileConfig {
    pub analyzer: AnalyzerOptions,
    pub insight: insight::InsightOptions,
    pub histogram_bins: HistogramBins,
}

/// Newtype so `ProfileConfig::default()` picks up the module constant.
#[derive(Debug, Clone, Copy)]
pub struct HistogramBins(pub usize);

impl Default for HistogramBins {
    fn default() -> Self {
        Self(chart::HISTOGRAM_BINS)
    }
}

/// File-level statistics shown on the report overview page.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub filename: String,
    pub size_bytes: u64,
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub duplicate_rows: usize,
}

impl FileStats {
    fn collect(input: &Path, size_bytes: u64, table: &Table) -> Self {
        Self {
            filename: input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input.csv".to_string()),
            size_bytes,
            rows: table.row_count(),
            columns: table.column_count(),
            missing_cells: table.missing_cell_count(),
            duplicate_rows: table.duplicate_row_count(),
        }
    }

    /// Decimal-unit humanized size, e.g. `12.3 KB`.
    pub fn human_size(&self) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut value = self.size_bytes as f64;
        let mut unit = 0usize;
        while value >= 1000.0 && unit < UNITS.len() - 1 {
            value /= 1000.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} B", self.size_bytes)
        } else {
            format!("{value:.1} {}", UNITS[unit])
        }
    }
}

/// Everything a completed run produced. Chart artifacts have been consumed
/// by the report at this point; only the report file remains on disk.
#[derive(Debug)]
pub struct ProfileOutcome {
    pub report_path: PathBuf,
    pub file_stats: FileStats,
    pub profiles: Vec<ColumnProfile>,
    pub insights: InsightSet,
}

/// Runs the whole profiling pipeline for one CSV file and writes the PDF
/// report under `output_dir`.
pub fn profile_csv(
    input: &Path,
    output_dir: &Path,
    config: &ProfileConfig,
) -> Result<ProfileOutcome, ProfileError> {
    let bytes = fs::read(input)
        .map_err(|err| ProfileError::Analysis(format!("reading {}: {err}", input.display())))?;
    let table = parse::parse_table(&bytes).map_err(|err| ProfileError::Parse(err.to_string()))?;
    info!(
        "Parsed '{}' into {} column(s) x {} row(s)",
        input.display(),
        table.column_count(),
        table.row_count()
    );
    run_analysis(input, output_dir, &table, bytes.len() as u64, config)
        .map_err(|err| ProfileError::Analysis(format!("{err:#}")))
}

fn run_analysis(
    input: &Path,
    output_dir: &Path,
    table: &Table,
    size_bytes: u64,
    config: &ProfileConfig,
) -> Result<ProfileOutcome> {
    // Scratch charts live in a run-private directory; its Drop is the
    // cleanup backstop for every failure path below.
    let scratch = tempfile::Builder::new()
        .prefix("csv-profiler-")
        .tempdir()
        .context("Creating scratch directory")?;
    let charts = ChartRenderer::new(scratch.path(), config.histogram_bins.0);

    let profiles = profile::profile_columns(table, &config.analyzer, &charts)?;
    let insights = insight::derive_insights(table, &profiles, &config.insight, &charts)?;
    let file_stats = FileStats::collect(input, size_bytes, table);

    let report_path = plan_report_path(input, output_dir)?;
    report::write_report(&report_path, &file_stats, &profiles, &insights)?;
    info!(
        "Report for {} row(s) across {} column(s) written to {:?}",
        file_stats.rows, file_stats.columns, report_path
    );

    Ok(ProfileOutcome {
        report_path,
        file_stats,
        profiles,
        insights,
    })
}

fn plan_report_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = clean_file_stem(input);
    let project_dir = output_dir.join(&stem);
    fs::create_dir_all(&project_dir)
        .with_context(|| format!("Creating output directory {project_dir:?}"))?;
    let timestamp = Local::now().format("%Y%m%d_%H%M");
    Ok(project_dir.join(format!("{stem}_profile_report_{timestamp}.pdf")))
}

/// Replaces non-alphanumeric characters in the input's file stem with `_`
/// and trims the result, falling back to `dataset` when nothing survives.
fn clean_file_stem(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "dataset".to_string()
    } else {
        trimmed.to_string()
    }
}
