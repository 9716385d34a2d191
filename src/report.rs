//! PDF report assembly.
//!
//! The report writer owns every chart artifact handed to it: each PNG is
//! deleted right after it is embedded, and an end-of-write sweep removes
//! whatever remains when assembly fails partway. On failure the output path
//! is removed as well, so no partial report file is ever left behind.
//!
//! Page order is fixed: title, key findings, correlation heatmap (when one
//! exists), file overview, then one page per column.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rgb,
};

use crate::insight::InsightSet;
use crate::pipeline::FileStats;
use crate::profile::{ColumnKind, ColumnProfile};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 14.0;
const BODY_SIZE_PT: f32 = 10.0;
const HEADING_SIZE_PT: f32 = 14.0;
const TITLE_SIZE_PT: f32 = 18.0;
const BODY_LINE_MM: f32 = 5.2;
const HEADING_LINE_MM: f32 = 8.0;
const CHART_DPI: f32 = 150.0;

/// Rough character budget per wrapped line for 10pt Helvetica across the
/// printable width. Precise metrics are not worth carrying for a report.
const WRAP_COLUMNS: usize = 96;

pub fn write_report(
    output_path: &Path,
    file_stats: &FileStats,
    profiles: &[ColumnProfile],
    insights: &InsightSet,
) -> Result<()> {
    let sweep = ArtifactSweep::collect(profiles, insights);
    let result = assemble(output_path, file_stats, profiles, insights);
    drop(sweep);
    if result.is_err() {
        let _ = fs::remove_file(output_path);
    }
    result
}

fn assemble(
    output_path: &Path,
    file_stats: &FileStats,
    profiles: &[ColumnProfile],
    insights: &InsightSet,
) -> Result<()> {
    let mut writer = PageWriter::new("CSV Profile Report")?;

    writer.title(&file_stats.filename);

    writer.new_page();
    writer.heading("Key Findings");
    for finding in &insights.key_findings {
        writer.bullet(finding);
    }

    if let Some(heatmap) = &insights.heatmap {
        writer.new_page();
        writer.heading("Correlation Analysis");
        writer.embed_chart(heatmap)?;
    }

    writer.new_page();
    writer.heading("File Overview");
    writer.line(&format!("Filename: {}", file_stats.filename));
    writer.line(&format!("File Size: {}", file_stats.human_size()));
    writer.line(&format!("Rows: {}", file_stats.rows));
    writer.line(&format!("Columns: {}", file_stats.columns));
    writer.line(&format!("Missing Cells: {}", file_stats.missing_cells));
    writer.line(&format!("Duplicate Rows: {}", file_stats.duplicate_rows));

    for profile in profiles {
        writer.new_page();
        column_page(&mut writer, profile, insights)?;
    }

    writer.save(output_path)?;
    debug!("Report written to {output_path:?}");
    Ok(())
}

fn column_page(writer: &mut PageWriter, profile: &ColumnProfile, insights: &InsightSet) -> Result<()> {
    writer.heading(&format!("Column: {}", profile.name));
    if insights.primary_keys.iter().any(|k| k == &profile.name) {
        writer.badge("Potential Primary Key");
    }
    writer.line(&format!("Type: {}", profile.kind.label()));
    writer.line(&format!("Missing Values: {}", profile.missing_count));
    writer.line(&format!("Unique Values: {}", profile.distinct_count));

    if let Some(summary) = &profile.numeric {
        writer.line(&format!("Mean: {}", format_stat(summary.mean)));
        writer.line(&format!("Standard Deviation: {}", format_stat(summary.std_dev)));
        writer.line(&format!("Min: {}", format_stat(summary.min)));
        writer.line(&format!("Max: {}", format_stat(summary.max)));
        writer.line(&format!("25th Percentile: {}", format_stat(summary.p25)));
        writer.line(&format!("Median: {}", format_stat(summary.median)));
        writer.line(&format!("75th Percentile: {}", format_stat(summary.p75)));

        if let Some(trend) = insights.trend_for(&profile.name) {
            writer.spacer(BODY_LINE_MM / 2.0);
            writer.subheading("Trend Analysis");
            writer.line(&format!("Trend: {}", capitalize(&trend.direction.to_string())));
            writer.line(&format!(
                "Distribution: {}",
                capitalize(&trend.shape.to_string())
            ));
        }
    }

    if profile.kind == ColumnKind::Categorical && !profile.top_values.is_empty() {
        writer.spacer(BODY_LINE_MM / 2.0);
        writer.subheading("Top Values");
        for (value, count) in &profile.top_values {
            writer.line(&format!("{value}: {count}"));
        }
    }

    if let Some(chart) = &profile.chart {
        writer.embed_chart(chart)?;
    }
    Ok(())
}

fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Deletes every chart artifact that still exists when dropped. Embedding
/// removes files eagerly; this is the error-path cleanup.
struct ArtifactSweep {
    paths: Vec<PathBuf>,
}

impl ArtifactSweep {
    fn collect(profiles: &[ColumnProfile], insights: &InsightSet) -> Self {
        let mut paths: Vec<PathBuf> = profiles.iter().filter_map(|p| p.chart.clone()).collect();
        if let Some(heatmap) = &insights.heatmap {
            paths.push(heatmap.clone());
        }
        Self { paths }
    }
}

impl Drop for ArtifactSweep {
    fn drop(&mut self) {
        for path in &self.paths {
            if path.exists()
                && let Err(err) = fs::remove_file(path)
            {
                warn!("Failed to remove chart artifact {path:?}: {err}");
            }
        }
    }
}

/// Cursor-based page writer over `printpdf`, tracking vertical position in
/// millimetres from the top of the current page.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor_mm: f32,
}

impl PageWriter {
    fn new(document_title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            document_title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "content",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| anyhow!("registering Helvetica: {err}"))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| anyhow!("registering Helvetica-Bold: {err}"))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor_mm: MARGIN_MM,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_mm = MARGIN_MM;
    }

    fn ensure_room(&mut self, needed_mm: f32) {
        if self.cursor_mm + needed_mm > PAGE_HEIGHT_MM - MARGIN_MM {
            self.new_page();
        }
    }

    fn baseline(&self) -> Mm {
        Mm(PAGE_HEIGHT_MM - self.cursor_mm)
    }

    fn title(&mut self, filename: &str) {
        self.cursor_mm = 80.0;
        self.layer.use_text(
            "CSV Profile Report",
            TITLE_SIZE_PT,
            Mm(MARGIN_MM + 46.0),
            self.baseline(),
            &self.bold,
        );
        self.cursor_mm += HEADING_LINE_MM * 2.0;
        self.layer.use_text(
            format!("Profiled file: {filename}"),
            BODY_SIZE_PT,
            Mm(MARGIN_MM + 46.0),
            self.baseline(),
            &self.regular,
        );
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(HEADING_LINE_MM);
        self.cursor_mm += HEADING_LINE_MM;
        self.layer
            .use_text(text, HEADING_SIZE_PT, Mm(MARGIN_MM), self.baseline(), &self.bold);
        self.cursor_mm += BODY_LINE_MM / 2.0;
    }

    fn subheading(&mut self, text: &str) {
        self.ensure_room(BODY_LINE_MM);
        self.cursor_mm += BODY_LINE_MM;
        self.layer
            .use_text(text, BODY_SIZE_PT, Mm(MARGIN_MM), self.baseline(), &self.bold);
    }

    fn badge(&mut self, text: &str) {
        self.ensure_room(BODY_LINE_MM);
        self.cursor_mm += BODY_LINE_MM;
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.5, 0.0, None)));
        self.layer
            .use_text(text, BODY_SIZE_PT, Mm(MARGIN_MM), self.baseline(), &self.bold);
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    fn line(&mut self, text: &str) {
        for wrapped in wrap_text(text, WRAP_COLUMNS) {
            self.ensure_room(BODY_LINE_MM);
            self.cursor_mm += BODY_LINE_MM;
            self.layer.use_text(
                wrapped,
                BODY_SIZE_PT,
                Mm(MARGIN_MM),
                self.baseline(),
                &self.regular,
            );
        }
    }

    fn bullet(&mut self, text: &str) {
        for (idx, wrapped) in wrap_text(text, WRAP_COLUMNS - 4).into_iter().enumerate() {
            self.ensure_room(BODY_LINE_MM);
            self.cursor_mm += BODY_LINE_MM;
            let prefix = if idx == 0 { "- " } else { "  " };
            self.layer.use_text(
                format!("{prefix}{wrapped}"),
                BODY_SIZE_PT,
                Mm(MARGIN_MM + 4.0),
                self.baseline(),
                &self.regular,
            );
        }
        self.cursor_mm += BODY_LINE_MM / 2.0;
    }

    fn spacer(&mut self, height_mm: f32) {
        self.cursor_mm += height_mm;
    }

    /// Embeds a chart PNG at the cursor and deletes the source file. The
    /// artifact is consumed whether or not embedding succeeds.
    fn embed_chart(&mut self, path: &Path) -> Result<()> {
        let embedded = self.embed_png(path);
        if let Err(err) = fs::remove_file(path) {
            warn!("Failed to remove chart artifact {path:?}: {err}");
        }
        embedded.with_context(|| format!("Embedding chart {path:?}"))
    }

    fn embed_png(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).with_context(|| format!("Opening chart {path:?}"))?;
        let decoder = PngDecoder::new(BufReader::new(file))
            .map_err(|err| anyhow!("decoding chart PNG: {err}"))?;
        let image = Image::try_from(decoder).map_err(|err| anyhow!("reading chart PNG: {err}"))?;

        let width_mm = px_to_mm(image.image.width.0);
        let height_mm = px_to_mm(image.image.height.0);
        self.ensure_room(height_mm + BODY_LINE_MM);
        self.cursor_mm += BODY_LINE_MM / 2.0;
        let y = PAGE_HEIGHT_MM - self.cursor_mm - height_mm;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(y)),
                dpi: Some(CHART_DPI),
                ..Default::default()
            },
        );
        self.cursor_mm += height_mm;
        debug!("Embedded chart {path:?} ({width_mm:.0}x{height_mm:.0} mm)");
        Ok(())
    }

    fn save(self, output_path: &Path) -> Result<()> {
        let file = File::create(output_path)
            .with_context(|| format!("Creating report file {output_path:?}"))?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(|err| anyhow!("serializing PDF: {err}"))
    }
}

fn px_to_mm(px: usize) -> f32 {
    px as f32 / CHART_DPI * 25.4
}

fn wrap_text(text: &str, limit: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > limit {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        if word_len > limit {
            // Hard-split words longer than a full line, on char boundaries.
            let chars: Vec<char> = word.chars().collect();
            let mut start = 0;
            while chars.len() - start > limit {
                lines.push(chars[start..start + limit].iter().collect());
                start += limit;
            }
            current.extend(&chars[start..]);
            current_len = chars.len() - start;
        } else {
            current.push_str(word);
            current_len += word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
