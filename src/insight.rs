//! Dataset-level observations derived from the parsed table and the
//! per-column statistics: primary-key candidates, pairwise correlations,
//! trends, outliers, data quality, and the narrated key findings.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::debug;

use crate::chart::ChartRenderer;
use crate::dataset::{Column, Table};
use crate::profile::ColumnProfile;
use crate::stats;

/// Minimum absolute Pearson correlation reported as a strong pair.
pub const CORRELATION_THRESHOLD: f64 = 0.5;

/// Row-index correlation magnitude beyond which a numeric column is
/// classified as trending rather than stable.
pub const TREND_THRESHOLD: f64 = 0.5;

/// Absolute skewness below which a distribution is considered normal.
pub const SKEWNESS_THRESHOLD: f64 = 0.5;

/// IQR multiplier for the outlier fences.
pub const OUTLIER_IQR_MULTIPLIER: f64 = 1.5;

/// Columns with this count difference or less between numeric and
/// categorical are narrated as a balanced dataset.
const TYPE_BALANCE_TOLERANCE: usize = 2;

/// Tunable thresholds. The defaults mirror the module constants; none of
/// them carries statistical rigor, they are reporting knobs.
#[derive(Debug, Clone, Copy)]
pub struct InsightOptions {
    pub correlation_threshold: f64,
    pub trend_threshold: f64,
    pub skewness_threshold: f64,
    pub outlier_iqr_multiplier: f64,
}

impl Default for InsightOptions {
    fn default() -> Self {
        Self {
            correlation_threshold: CORRELATION_THRESHOLD,
            trend_threshold: TREND_THRESHOLD,
            skewness_threshold: SKEWNESS_THRESHOLD,
            outlier_iqr_multiplier: OUTLIER_IQR_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionShape {
    Normal,
    RightSkewed,
    LeftSkewed,
}

impl fmt::Display for DistributionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DistributionShape::Normal => "normal",
            DistributionShape::RightSkewed => "right-skewed",
            DistributionShape::LeftSkewed => "left-skewed",
        };
        write!(f, "{label}")
    }
}

/// Monotonic-trend and distribution classification for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendFinding {
    pub direction: TrendDirection,
    pub shape: DistributionShape,
    pub skewness: Option<f64>,
}

/// Pair of numeric columns whose absolute correlation exceeds the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationFinding {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
}

impl CorrelationFinding {
    pub fn is_positive(&self) -> bool {
        self.coefficient > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierFinding {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataQuality {
    /// `(1 - missing / total) * 100`; 100 for an empty table.
    pub completeness_percent: f64,
    pub missing_cells: usize,
    pub columns_with_missing: Vec<String>,
}

/// Aggregate derived observations for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightSet {
    pub primary_keys: Vec<String>,
    /// Trend findings in numeric-column order.
    pub trends: Vec<(String, TrendFinding)>,
    pub correlations: Vec<CorrelationFinding>,
    pub outliers: Vec<OutlierFinding>,
    pub quality: DataQuality,
    /// Narrated findings in fixed order: quality, dimensions, primary keys,
    /// correlations, non-stable trends, type balance, outliers.
    pub key_findings: Vec<String>,
    /// Correlation heatmap artifact, present when the table has at least
    /// two numeric columns.
    pub heatmap: Option<PathBuf>,
}

impl InsightSet {
    pub fn trend_for(&self, column: &str) -> Option<&TrendFinding> {
        self.trends
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, finding)| finding)
    }
}

/// Derives the full insight set for a table. `profiles` must be the output
/// of [`crate::profile::profile_columns`] for the same table.
pub fn derive_insights(
    table: &Table,
    profiles: &[ColumnProfile],
    options: &InsightOptions,
    charts: &ChartRenderer,
) -> Result<InsightSet> {
    let primary_keys = identify_primary_keys(table);
    let trends = analyze_trends(table, options);
    let numeric: Vec<&Column> = table.columns().iter().filter(|c| c.is_numeric()).collect();

    let (correlations, heatmap) = if numeric.len() >= 2 {
        let cells: Vec<&[Option<f64>]> = numeric
            .iter()
            .filter_map(|c| c.numeric_cells())
            .collect();
        let matrix = correlation_matrix(&cells);
        let findings = strong_correlations(&numeric, &matrix, options.correlation_threshold);
        let heatmap = charts
            .render_heatmap(&matrix)
            .context("Rendering correlation heatmap")?;
        (findings, Some(heatmap))
    } else {
        (Vec::new(), None)
    };

    let outliers = detect_outliers(table, options.outlier_iqr_multiplier);
    let quality = assess_quality(table);
    let key_findings = compose_key_findings(
        table,
        profiles,
        &primary_keys,
        &trends,
        &correlations,
        &outliers,
        &quality,
    );
    debug!(
        "Derived {} key finding(s), {} strong correlation(s), {} trend(s)",
        key_findings.len(),
        correlations.len(),
        trends.len()
    );

    Ok(InsightSet {
        primary_keys,
        trends,
        correlations,
        outliers,
        quality,
        key_findings,
        heatmap,
    })
}

/// A column is a candidate key iff it has no missing values and its distinct
/// count equals the row count. Every qualifying column is reported.
pub fn identify_primary_keys(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|column| {
            column.missing_count() == 0 && column.distinct_count() == table.row_count()
        })
        .map(|column| column.name().to_string())
        .collect()
}

/// Full pairwise Pearson matrix over the given numeric columns, computed on
/// pairwise-complete observations. Diagonal is exactly 1.0; undefined
/// entries are NaN.
pub fn correlation_matrix(columns: &[&[Option<f64>]]) -> Vec<Vec<f64>> {
    let n = columns.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
    }
    for (i, j) in (0..n).tuple_combinations() {
        let r = pairwise_pearson(columns[i], columns[j]).unwrap_or(f64::NAN);
        matrix[i][j] = r;
        matrix[j][i] = r;
    }
    matrix
}

fn pairwise_pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (x, y) in xs.iter().zip(ys) {
        if let (Some(x), Some(y)) = (x, y) {
            left.push(*x);
            right.push(*y);
        }
    }
    stats::pearson(&left, &right)
}

fn strong_correlations(
    numeric: &[&Column],
    matrix: &[Vec<f64>],
    threshold: f64,
) -> Vec<CorrelationFinding> {
    let mut findings = Vec::new();
    for (i, j) in (0..numeric.len()).tuple_combinations() {
        let coefficient = matrix[i][j];
        if coefficient.is_finite() && coefficient.abs() > threshold {
            findings.push(CorrelationFinding {
                left: numeric[i].name().to_string(),
                right: numeric[j].name().to_string(),
                coefficient,
            });
        }
    }
    findings
}

/// Classifies each numeric column with more than one non-missing value by
/// correlating its compacted value sequence against 0..k-1, and by its
/// sample skewness.
pub fn analyze_trends(table: &Table, options: &InsightOptions) -> Vec<(String, TrendFinding)> {
    let mut trends = Vec::new();
    for column in table.columns().iter().filter(|c| c.is_numeric()) {
        let values = column.numeric_values().unwrap_or_default();
        if values.len() < 2 {
            continue;
        }
        let index: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        let direction = match stats::pearson(&values, &index) {
            Some(r) if r > options.trend_threshold => TrendDirection::Increasing,
            Some(r) if r < -options.trend_threshold => TrendDirection::Decreasing,
            _ => TrendDirection::Stable,
        };
        let skewness = stats::skewness(&values);
        let shape = match skewness {
            Some(s) if s.abs() < options.skewness_threshold => DistributionShape::Normal,
            Some(s) if s > 0.0 => DistributionShape::RightSkewed,
            Some(_) => DistributionShape::LeftSkewed,
            // Undefined skew (too few values or zero variance) reads as normal.
            None => DistributionShape::Normal,
        };
        trends.push((
            column.name().to_string(),
            TrendFinding {
                direction,
                shape,
                skewness,
            },
        ));
    }
    trends
}

/// Flags numeric columns holding values outside `[Q1 - k*IQR, Q3 + k*IQR]`.
pub fn detect_outliers(table: &Table, iqr_multiplier: f64) -> Vec<OutlierFinding> {
    let mut findings = Vec::new();
    for column in table.columns().iter().filter(|c| c.is_numeric()) {
        let mut values = column.numeric_values().unwrap_or_default();
        if values.is_empty() {
            continue;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let (Some(q1), Some(q3)) = (
            stats::percentile(&values, 0.25),
            stats::percentile(&values, 0.75),
        ) else {
            continue;
        };
        let iqr = q3 - q1;
        let lower = q1 - iqr_multiplier * iqr;
        let upper = q3 + iqr_multiplier * iqr;
        let count = values.iter().filter(|v| **v < lower || **v > upper).count();
        if count > 0 {
            findings.push(OutlierFinding {
                column: column.name().to_string(),
                count,
            });
        }
    }
    findings
}

pub fn assess_quality(table: &Table) -> DataQuality {
    let total_cells = table.row_count() * table.column_count();
    let missing_cells = table.missing_cell_count();
    let completeness_percent = if total_cells == 0 {
        100.0
    } else {
        (1.0 - missing_cells as f64 / total_cells as f64) * 100.0
    };
    let columns_with_missing = table
        .columns()
        .iter()
        .filter(|c| c.missing_count() > 0)
        .map(|c| c.name().to_string())
        .collect();
    DataQuality {
        completeness_percent,
        missing_cells,
        columns_with_missing,
    }
}

fn compose_key_findings(
    table: &Table,
    profiles: &[ColumnProfile],
    primary_keys: &[String],
    trends: &[(String, TrendFinding)],
    correlations: &[CorrelationFinding],
    outliers: &[OutlierFinding],
    quality: &DataQuality,
) -> Vec<String> {
    let mut findings = Vec::new();

    findings.push(format!(
        "Data Quality Assessment: overall data completeness is {:.2}%, with {} missing value(s) across {} column(s).",
        quality.completeness_percent,
        quality.missing_cells,
        quality.columns_with_missing.len()
    ));
    findings.push(format!(
        "Dataset Dimensions: {} record(s) with {} attribute(s).",
        table.row_count(),
        table.column_count()
    ));

    if !primary_keys.is_empty() {
        let described = primary_keys
            .iter()
            .map(|name| {
                let distinct = table
                    .column(name)
                    .map(Column::distinct_count)
                    .unwrap_or_default();
                format!("{name} ({distinct} unique values)")
            })
            .join(", ");
        findings.push(format!(
            "Primary Key Analysis: identified {} potential primary key(s): {}. These columns uniquely identify each record.",
            primary_keys.len(),
            described
        ));
    }

    for finding in correlations {
        let direction = if finding.is_positive() {
            "positive"
        } else {
            "negative"
        };
        let tendency = if finding.is_positive() {
            "increase"
        } else {
            "decrease"
        };
        findings.push(format!(
            "Strong {direction} correlation ({:.2}) between {} and {}: as {} increases, {} tends to {tendency} proportionally.",
            finding.coefficient.abs(),
            finding.left,
            finding.right,
            finding.left,
            finding.right
        ));
    }

    for (column, trend) in trends {
        if trend.direction == TrendDirection::Stable {
            continue;
        }
        let mut line = format!(
            "Trend Analysis for {column}: {} trend with {} distribution.",
            trend.direction, trend.shape
        );
        let summary = profiles
            .iter()
            .find(|p| &p.name == column)
            .and_then(|p| p.numeric.as_ref());
        if let Some(summary) = summary
            && let (Some(mean), Some(std_dev)) = (summary.mean, summary.std_dev)
        {
            line.push_str(&format!(
                " Mean value is {mean:.2} with a standard deviation of {std_dev:.2}."
            ));
        }
        findings.push(line);
    }

    let numeric_columns = table.numeric_column_count();
    let categorical_columns = table.column_count() - numeric_columns;
    let balance = if numeric_columns.abs_diff(categorical_columns) <= TYPE_BALANCE_TOLERANCE {
        "a balanced".to_string()
    } else if numeric_columns > categorical_columns {
        "a predominantly numeric".to_string()
    } else {
        "a predominantly categorical".to_string()
    };
    findings.push(format!(
        "Data Type Distribution: the dataset contains {numeric_columns} numeric column(s) and {categorical_columns} categorical column(s), suggesting {balance} dataset."
    ));

    if !outliers.is_empty() {
        let described = outliers
            .iter()
            .map(|o| format!("{} ({} outlier(s))", o.column, o.count))
            .join(", ");
        findings.push(format!(
            "Outlier Detection: found potential outliers in the following numeric column(s): {described}. These may require further investigation or special handling."
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::HISTOGRAM_BINS;
    use crate::parse::parse_table;
    use crate::profile::{AnalyzerOptions, profile_columns};
    use proptest::prelude::*;

    fn insights_for(csv: &[u8]) -> InsightSet {
        let scratch = tempfile::tempdir().expect("temp dir");
        let charts = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        let table = parse_table(csv).expect("table");
        let profiles =
            profile_columns(&table, &AnalyzerOptions::default(), &charts).expect("profiles");
        derive_insights(&table, &profiles, &InsightOptions::default(), &charts).expect("insights")
    }

    #[test]
    fn primary_key_requires_uniqueness_and_no_missing() {
        // "id" qualifies; "dup" has a duplicate; "gappy" is unique but has
        // a missing value; "name" is unique text and qualifies too.
        let insights = insights_for(
            b"id,dup,gappy,name\n1,1,1,a\n2,1,2,b\n3,2,,c\n",
        );
        assert_eq!(insights.primary_keys, vec!["id", "name"]);
    }

    #[test]
    fn outlier_flagged_under_iqr_rule() {
        let insights = insights_for(b"x,pad\n1,a\n2,a\n3,a\n4,a\n5,a\n100,a\n");
        assert_eq!(insights.outliers.len(), 1);
        assert_eq!(insights.outliers[0].column, "x");
        assert_eq!(insights.outliers[0].count, 1);
    }

    #[test]
    fn monotone_columns_report_trends_and_correlations() {
        let insights = insights_for(
            b"up,down,label\n1,9,a\n2,8,b\n3,7,a\n4,6,b\n5,5,a\n",
        );
        assert_eq!(
            insights.trend_for("up").unwrap().direction,
            TrendDirection::Increasing
        );
        assert_eq!(
            insights.trend_for("down").unwrap().direction,
            TrendDirection::Decreasing
        );
        assert_eq!(insights.correlations.len(), 1);
        let pair = &insights.correlations[0];
        assert_eq!((pair.left.as_str(), pair.right.as_str()), ("up", "down"));
        assert!(pair.coefficient < -0.99);
        assert!(!pair.is_positive());
        assert!(insights.heatmap.is_some());
    }

    #[test]
    fn single_numeric_column_yields_no_correlation_section() {
        let insights = insights_for(b"x,label\n1,a\n2,b\n3,c\n");
        assert!(insights.correlations.is_empty());
        assert!(insights.heatmap.is_none());
    }

    #[test]
    fn constant_column_trend_is_stable_and_normal() {
        let insights = insights_for(b"flat,label\n5,a\n5,b\n5,c\n5,d\n");
        let trend = insights.trend_for("flat").unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.shape, DistributionShape::Normal);
        assert_eq!(trend.skewness, None);
    }

    #[test]
    fn quality_counts_missing_cells_and_columns() {
        let insights = insights_for(b"a,b\n1,\n2,x\n,y\n3,z\n");
        assert_eq!(insights.quality.missing_cells, 2);
        assert_eq!(insights.quality.columns_with_missing, vec!["a", "b"]);
        assert!((insights.quality.completeness_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn key_findings_follow_the_fixed_order() {
        let insights = insights_for(
            b"id,up,down,label\n1,1,9,a\n2,2,8,b\n3,3,7,a\n4,4,6,b\n5,5,105,a\n",
        );
        let findings = &insights.key_findings;
        assert!(findings[0].starts_with("Data Quality Assessment:"));
        assert!(findings[0].contains("100.00%"));
        assert!(findings[1].starts_with("Dataset Dimensions: 5 record(s) with 4 attribute(s)"));
        assert!(findings[2].starts_with("Primary Key Analysis:"));
        let trend_idx = findings
            .iter()
            .position(|f| f.starts_with("Trend Analysis for up:"))
            .expect("trend finding");
        assert!(findings[trend_idx].contains("increasing trend"));
        assert!(findings[trend_idx].contains("Mean value is 3.00"));
        let type_idx = findings
            .iter()
            .position(|f| f.starts_with("Data Type Distribution:"))
            .expect("type finding");
        assert!(findings[type_idx].contains("3 numeric column(s) and 1 categorical column(s)"));
        assert!(trend_idx < type_idx);
        assert!(findings.last().unwrap().starts_with("Outlier Detection:"));
    }

    #[test]
    fn stable_trends_are_not_narrated() {
        let insights = insights_for(b"noise,label\n5,a\n1,b\n4,c\n2,d\n3,e\n");
        assert!(
            insights
                .key_findings
                .iter()
                .all(|f| !f.starts_with("Trend Analysis"))
        );
        assert_eq!(
            insights.trend_for("noise").unwrap().direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn empty_table_produces_defined_insights() {
        let scratch = tempfile::tempdir().expect("temp dir");
        let charts = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        let table = crate::dataset::Table::from_rows(
            vec!["a".into(), "b".into()],
            Vec::new(),
        )
        .expect("table");
        let profiles =
            profile_columns(&table, &AnalyzerOptions::default(), &charts).expect("profiles");
        let insights = derive_insights(&table, &profiles, &InsightOptions::default(), &charts)
            .expect("insights");
        assert!((insights.quality.completeness_percent - 100.0).abs() < 1e-9);
        assert!(insights.trends.is_empty());
        assert!(insights.outliers.is_empty());
    }

    proptest! {
        #[test]
        fn correlation_matrix_is_symmetric_with_unit_diagonal(
            rows in prop::collection::vec(
                prop::collection::vec(-1000.0f64..1000.0, 3),
                2..40,
            )
        ) {
            let columns: Vec<Vec<Option<f64>>> = (0..3)
                .map(|c| rows.iter().map(|row| Some(row[c])).collect())
                .collect();
            let refs: Vec<&[Option<f64>]> =
                columns.iter().map(|c| c.as_slice()).collect();
            let matrix = correlation_matrix(&refs);
            for i in 0..3 {
                prop_assert_eq!(matrix[i][i], 1.0);
                for j in 0..3 {
                    let a = matrix[i][j];
                    let b = matrix[j][i];
                    prop_assert!(
                        (a.is_nan() && b.is_nan()) || a == b,
                        "asymmetry at ({}, {}): {} vs {}", i, j, a, b
                    );
                    prop_assert!(a.is_nan() || (-1.0..=1.0).contains(&a));
                }
            }
        }
    }
}
