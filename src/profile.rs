//! Per-column descriptive statistics and chart selection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

use crate::chart::ChartRenderer;
use crate::dataset::{Column, ColumnValues, Table};
use crate::stats;

/// Most frequent values retained per categorical column.
pub const TOP_VALUES: usize = 10;

/// Categorical columns above this distinct-value count get no bar chart;
/// the result is unreadably dense.
pub const CATEGORICAL_CHART_MAX_DISTINCT: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerOptions {
    pub top_values: usize,
    pub categorical_chart_max_distinct: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            top_values: TOP_VALUES,
            categorical_chart_max_distinct: CATEGORICAL_CHART_MAX_DISTINCT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

/// Summary statistics for a numeric column. Each field is `None` when the
/// statistic is undefined for the observed values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericSummary {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
}

/// Computed descriptive statistics for one column; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub missing_count: usize,
    pub distinct_count: usize,
    /// Present for numeric columns only.
    pub numeric: Option<NumericSummary>,
    /// Top-N most frequent values with counts, highest first; ties broken
    /// by value so the ordering is deterministic. Empty for numeric columns.
    pub top_values: Vec<(String, usize)>,
    /// Chart artifact rendered for this column, when one applies.
    pub chart: Option<PathBuf>,
}

/// Profiles every column of the table in order, rendering a chart artifact
/// per column where one applies.
pub fn profile_columns(
    table: &Table,
    options: &AnalyzerOptions,
    charts: &ChartRenderer,
) -> Result<Vec<ColumnProfile>> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            profile_column(index, column, options, charts)
                .with_context(|| format!("Profiling column '{}'", column.name()))
        })
        .collect()
}

fn profile_column(
    index: usize,
    column: &Column,
    options: &AnalyzerOptions,
    charts: &ChartRenderer,
) -> Result<ColumnProfile> {
    let missing_count = column.missing_count();
    let distinct_count = column.distinct_count();

    match column.values() {
        ColumnValues::Numeric(_) => {
            let values = column.numeric_values().unwrap_or_default();
            let summary = numeric_summary(&values);
            let chart = if values.is_empty() {
                None
            } else {
                Some(charts.render_histogram(index, &values)?)
            };
            debug!(
                "Column '{}': numeric, {} value(s), {} missing",
                column.name(),
                values.len(),
                missing_count
            );
            Ok(ColumnProfile {
                name: column.name().to_string(),
                kind: ColumnKind::Numeric,
                missing_count,
                distinct_count,
                numeric: Some(summary),
                top_values: Vec::new(),
                chart,
            })
        }
        ColumnValues::Text(cells) => {
            let top_values = top_value_counts(cells, options.top_values);
            let chart = if !top_values.is_empty()
                && distinct_count <= options.categorical_chart_max_distinct
            {
                Some(charts.render_bar_chart(index, &top_values)?)
            } else {
                None
            };
            debug!(
                "Column '{}': categorical, {} distinct, {} missing",
                column.name(),
                distinct_count,
                missing_count
            );
            Ok(ColumnProfile {
                name: column.name().to_string(),
                kind: ColumnKind::Categorical,
                missing_count,
                distinct_count,
                numeric: None,
                top_values,
                chart,
            })
        }
    }
}

fn numeric_summary(values: &[f64]) -> NumericSummary {
    if values.is_empty() {
        return NumericSummary::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    NumericSummary {
        mean: stats::mean(values),
        std_dev: stats::sample_std_dev(values),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        p25: stats::percentile(&sorted, 0.25),
        median: stats::percentile(&sorted, 0.50),
        p75: stats::percentile(&sorted, 0.75),
    }
}

fn top_value_counts(cells: &[Option<String>], top: usize) -> Vec<(String, usize)> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for value in cells.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    let mut items: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(top);
    items
}
