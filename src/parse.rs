//! CSV parsing with encoding and delimiter fallback.
//!
//! The input bytes are tried against a fixed, ordered list of
//! (character-encoding, field-delimiter) pairs. An attempt is accepted only
//! when decoding reports no errors, every record has a consistent field
//! count, and the result carries more than one column; a single-column
//! "success" almost always means the delimiter guess was wrong. The first
//! accepted attempt wins; exhausting the list is a terminal parse failure.
//!
//! Each attempt is an ordinary `Result` value. Nothing here panics on
//! malformed input.

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8, UTF_16LE, WINDOWS_1252};
use log::debug;

use crate::dataset::Table;

/// Encodings tried in order: UTF-8 first, then UTF-16 (BOM-sniffed by
/// `encoding_rs`), then Windows-1252 as the catch-all Latin-1 fallback.
pub const ENCODING_ATTEMPTS: &[&Encoding] = &[UTF_8, UTF_16LE, WINDOWS_1252];

/// Delimiters tried for each encoding, most common first.
pub const DELIMITER_ATTEMPTS: &[u8] = &[b',', b';', b'\t'];

/// Cell contents treated as missing after trimming.
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", "NaN", "nan", "#N/A",
];

/// Parses CSV bytes into a [`Table`], trying every (encoding, delimiter)
/// combination in order and accepting the first multi-column result.
pub fn parse_table(bytes: &[u8]) -> Result<Table> {
    let mut attempts = 0usize;
    for encoding in ENCODING_ATTEMPTS {
        let Some(text) = decode(bytes, encoding) else {
            debug!("Decoding as {} failed, skipping", encoding.name());
            attempts += DELIMITER_ATTEMPTS.len();
            continue;
        };
        for &delimiter in DELIMITER_ATTEMPTS {
            attempts += 1;
            match try_parse(&text, delimiter) {
                Ok(Some(table)) => {
                    debug!(
                        "Accepted encoding {} with delimiter '{}' ({} column(s), {} row(s))",
                        encoding.name(),
                        printable_delimiter(delimiter),
                        table.column_count(),
                        table.row_count()
                    );
                    return Ok(table);
                }
                Ok(None) => debug!(
                    "Rejected encoding {} with delimiter '{}': single column",
                    encoding.name(),
                    printable_delimiter(delimiter)
                ),
                Err(err) => debug!(
                    "Rejected encoding {} with delimiter '{}': {err}",
                    encoding.name(),
                    printable_delimiter(delimiter)
                ),
            }
        }
    }
    Err(anyhow!(
        "no encoding/delimiter combination produced a multi-column table ({attempts} attempts)"
    ))
}

fn decode(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// One parse attempt. `Ok(None)` means the parse succeeded but yielded a
/// single column, which the caller treats as a wrong-delimiter rejection.
fn try_parse(text: &str, delimiter: u8) -> Result<Option<Table>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.len() <= 1 {
        return Ok(None);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(normalize_cell).collect());
    }
    Table::from_rows(headers, rows).map(Some)
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
