//! Chart artifact rendering via `plotters`.
//!
//! Every chart is a PNG written into the run's scratch directory under a
//! name derived from the run id, so concurrent runs over same-named inputs
//! can never collide. Rendering configuration is explicit state on
//! [`ChartRenderer`], so there is no process-wide plotting backend to mutate.
//!
//! Charts are intentionally text-free geometry; captions and axis context
//! are supplied by the report pages that embed them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;
use uuid::Uuid;

/// Default histogram bin count for numeric columns.
pub const HISTOGRAM_BINS: usize = 30;

const HISTOGRAM_SIZE: (u32, u32) = (800, 400);
const BAR_CHART_SIZE: (u32, u32) = (800, 400);
const HEATMAP_SIZE: (u32, u32) = (700, 600);
const CHART_MARGIN: u32 = 12;

/// Renders chart artifacts for one profiling run.
pub struct ChartRenderer {
    scratch_dir: PathBuf,
    run_id: Uuid,
    bins: usize,
}

impl ChartRenderer {
    pub fn new(scratch_dir: &Path, bins: usize) -> Self {
        Self {
            scratch_dir: scratch_dir.to_path_buf(),
            run_id: Uuid::new_v4(),
            bins: bins.max(1),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn artifact_path(&self, index: usize, kind: &str) -> PathBuf {
        self.scratch_dir
            .join(format!("{}_{index}_{kind}.png", self.run_id.simple()))
    }

    /// Histogram over the non-missing values of a numeric column.
    pub fn render_histogram(&self, column_index: usize, values: &[f64]) -> Result<PathBuf> {
        let path = self.artifact_path(column_index, "hist");
        let (min, max) = padded_bounds(values)
            .ok_or_else(|| anyhow!("histogram requires at least one value"))?;
        let width = max - min;
        let mut counts = vec![0usize; self.bins];
        for value in values {
            let bin = (((value - min) / width) * self.bins as f64) as usize;
            counts[bin.min(self.bins - 1)] += 1;
        }
        let y_max = counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.05;

        let root = BitMapBackend::new(&path, HISTOGRAM_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(CHART_MARGIN)
            .build_cartesian_2d(min..max, 0f64..y_max)
            .map_err(draw_error)?;
        let step = width / self.bins as f64;
        chart
            .draw_series(counts.iter().enumerate().map(|(bin, count)| {
                let x0 = min + step * bin as f64;
                Rectangle::new([(x0, 0.0), (x0 + step, *count as f64)], BLUE.mix(0.6).filled())
            }))
            .map_err(draw_error)?;
        root.present()
            .map_err(draw_error)
            .with_context(|| format!("Writing chart to {path:?}"))?;
        drop(chart);
        drop(root);
        Ok(path)
    }

    /// Bar chart of the most frequent values of a categorical column,
    /// highest count first.
    pub fn render_bar_chart(&self, column_index: usize, counts: &[(String, usize)]) -> Result<PathBuf> {
        let path = self.artifact_path(column_index, "bars");
        if counts.is_empty() {
            return Err(anyhow!("bar chart requires at least one value"));
        }
        let y_max = counts.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1) as f64 * 1.05;
        let bars = counts.len() as f64;

        let root = BitMapBackend::new(&path, BAR_CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(CHART_MARGIN)
            .build_cartesian_2d(0f64..bars, 0f64..y_max)
            .map_err(draw_error)?;
        chart
            .draw_series(counts.iter().enumerate().map(|(idx, (_, count))| {
                let x0 = idx as f64 + 0.1;
                let x1 = idx as f64 + 0.9;
                Rectangle::new([(x0, 0.0), (x1, *count as f64)], BLUE.mix(0.8).filled())
            }))
            .map_err(draw_error)?;
        root.present()
            .map_err(draw_error)
            .with_context(|| format!("Writing chart to {path:?}"))?;
        drop(chart);
        drop(root);
        Ok(path)
    }

    /// Diverging-color heatmap of a square correlation matrix. Row 0 is
    /// drawn at the top; undefined cells render white.
    pub fn render_heatmap(&self, matrix: &[Vec<f64>]) -> Result<PathBuf> {
        let path = self.artifact_path(0, "heatmap");
        let n = matrix.len() as i32;
        if n == 0 {
            return Err(anyhow!("heatmap requires a non-empty matrix"));
        }

        let root = BitMapBackend::new(&path, HEATMAP_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(CHART_MARGIN)
            .build_cartesian_2d(0..n, 0..n)
            .map_err(draw_error)?;
        chart
            .draw_series(matrix.iter().enumerate().flat_map(|(row, cells)| {
                cells.iter().enumerate().map(move |(col, value)| {
                    let x = col as i32;
                    let y = n - 1 - row as i32;
                    Rectangle::new([(x, y), (x + 1, y + 1)], correlation_color(*value).filled())
                })
            }))
            .map_err(draw_error)?;
        root.present()
            .map_err(draw_error)
            .with_context(|| format!("Writing chart to {path:?}"))?;
        drop(chart);
        drop(root);
        Ok(path)
    }
}

/// Blue-white-red diverging map over [-1, 1].
fn correlation_color(value: f64) -> RGBColor {
    if !value.is_finite() {
        return WHITE;
    }
    let clamped = value.clamp(-1.0, 1.0);
    let blend = |from: u8, to: u8, t: f64| (from as f64 + (to as f64 - from as f64) * t) as u8;
    if clamped < 0.0 {
        let t = 1.0 + clamped;
        RGBColor(blend(59, 255, t), blend(76, 255, t), blend(192, 255, t))
    } else {
        let t = clamped;
        RGBColor(blend(255, 180, t), blend(255, 4, t), blend(255, 38, t))
    }
}

fn padded_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        min = min.min(*value);
        max = max.max(*value);
    }
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    if max - min < f64::EPSILON {
        // Degenerate single-valued range; widen so binning stays defined.
        min -= 0.5;
        max += 0.5;
    }
    Some((min, max))
}

fn draw_error(err: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("chart rendering failed: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_renders_png_into_scratch_dir() {
        let scratch = tempfile::tempdir().expect("temp dir");
        let renderer = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        let values: Vec<f64> = (0..100).map(|i| (i % 13) as f64).collect();
        let path = renderer.render_histogram(2, &values).expect("histogram");
        let metadata = std::fs::metadata(&path).expect("chart file");
        assert!(metadata.len() > 0);
        assert!(path.file_name().unwrap().to_str().unwrap().contains("_2_hist"));
    }

    #[test]
    fn single_valued_histogram_does_not_fail() {
        let scratch = tempfile::tempdir().expect("temp dir");
        let renderer = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        renderer
            .render_histogram(0, &[4.0, 4.0, 4.0])
            .expect("degenerate histogram");
    }

    #[test]
    fn bar_chart_and_heatmap_render() {
        let scratch = tempfile::tempdir().expect("temp dir");
        let renderer = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        let counts = vec![("a".to_string(), 5), ("b".to_string(), 2)];
        renderer.render_bar_chart(1, &counts).expect("bar chart");
        let matrix = vec![vec![1.0, -0.8], vec![-0.8, 1.0]];
        renderer.render_heatmap(&matrix).expect("heatmap");
    }

    #[test]
    fn artifact_names_embed_the_run_id() {
        let scratch = tempfile::tempdir().expect("temp dir");
        let first = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        let second = ChartRenderer::new(scratch.path(), HISTOGRAM_BINS);
        let a = first.render_histogram(0, &[1.0, 2.0]).expect("first");
        let b = second.render_histogram(0, &[1.0, 2.0]).expect("second");
        assert_ne!(a, b);
    }

    #[test]
    fn correlation_color_is_diverging() {
        assert_eq!(correlation_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(correlation_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(correlation_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(correlation_color(f64::NAN), RGBColor(255, 255, 255));
    }
}
