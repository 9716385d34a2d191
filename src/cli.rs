use std::path::PathBuf;

use clap::Parser;

use crate::{chart, insight, pipeline::{HistogramBins, ProfileConfig}, profile};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Profile a CSV file into a PDF report with statistics, insights, and charts",
    long_about = None
)]
pub struct Cli {
    /// Input CSV file to profile (encoding and delimiter are auto-detected)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory receiving the report; a per-file subdirectory is created inside it
    #[arg(short = 'o', long = "output-dir", default_value = "output")]
    pub output_dir: PathBuf,
    /// Minimum absolute Pearson correlation reported as a strong pair
    #[arg(long, default_value_t = insight::CORRELATION_THRESHOLD)]
    pub correlation_threshold: f64,
    /// Row-index correlation magnitude that classifies a column as trending
    #[arg(long, default_value_t = insight::TREND_THRESHOLD)]
    pub trend_threshold: f64,
    /// Absolute skewness below which a distribution is reported as normal
    #[arg(long, default_value_t = insight::SKEWNESS_THRESHOLD)]
    pub skewness_threshold: f64,
    /// IQR multiplier for the outlier fences
    #[arg(long, default_value_t = insight::OUTLIER_IQR_MULTIPLIER)]
    pub outlier_iqr_multiplier: f64,
    /// Most frequent values retained per categorical column
    #[arg(long, default_value_t = profile::TOP_VALUES)]
    pub top_values: usize,
    /// Distinct-value count above which a categorical column gets no bar chart
    #[arg(long, default_value_t = profile::CATEGORICAL_CHART_MAX_DISTINCT)]
    pub max_chart_categories: usize,
    /// Histogram bin count for numeric column charts
    #[arg(long, default_value_t = chart::HISTOGRAM_BINS)]
    pub histogram_bins: usize,
}

impl Cli {
    pub fn to_config(&self) -> ProfileConfig {
        ProfileConfig {
            analyzer: profile::AnalyzerOptions {
                top_values: self.top_values,
                categorical_chart_max_distinct: self.max_chart_categories,
            },
            insight: insight::InsightOptions {
                correlation_threshold: self.correlation_threshold,
                trend_threshold: self.trend_threshold,
                skewness_threshold: self.skewness_threshold,
                outlier_iqr_multiplier: self.outlier_iqr_multiplier,
            },
            histogram_bins: HistogramBins(self.histogram_bins),
        }
    }
}
