//! In-memory tabular model produced by the parser.
//!
//! A [`Table`] is an ordered sequence of named columns of equal length. Each
//! column is typed at construction time: numeric when every non-missing cell
//! parses as a float, textual otherwise. Missing cells are `None` in both
//! representations, so an entirely blank column is still a valid (numeric)
//! column with degenerate statistics rather than an error.

use std::collections::HashSet;

use anyhow::{Result, ensure};

/// Typed cell storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
}

impl Column {
    pub fn new(name: String, raw: Vec<Option<String>>) -> Self {
        let values = infer_values(raw);
        Self { name, values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(cells) => cells.len(),
            ColumnValues::Text(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Numeric(_))
    }

    pub fn missing_count(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(cells) => cells.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Text(cells) => cells.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Count of distinct non-missing values.
    pub fn distinct_count(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(cells) => cells
                .iter()
                .flatten()
                .map(|v| v.to_bits())
                .collect::<HashSet<_>>()
                .len(),
            ColumnValues::Text(cells) => cells
                .iter()
                .flatten()
                .map(|v| v.as_str())
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    /// Non-missing numeric values in row order, or `None` for text columns.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match &self.values {
            ColumnValues::Numeric(cells) => Some(cells.iter().flatten().copied().collect()),
            ColumnValues::Text(_) => None,
        }
    }

    /// Numeric cells including missing slots, or `None` for text columns.
    pub fn numeric_cells(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(cells) => Some(cells),
            ColumnValues::Text(_) => None,
        }
    }

    fn row_key(&self, row: usize, key: &mut String) {
        match &self.values {
            ColumnValues::Numeric(cells) => match cells.get(row).copied().flatten() {
                Some(value) => key.push_str(&format!("n{:016x}", value.to_bits())),
                None => key.push('-'),
            },
            ColumnValues::Text(cells) => match cells.get(row).and_then(|c| c.as_deref()) {
                Some(value) => {
                    key.push('t');
                    key.push_str(value);
                }
                None => key.push('-'),
            },
        }
        key.push('\u{1f}');
    }
}

/// Parsed tabular dataset. Read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table from a header row and row-major cells. Duplicate header
    /// names are disambiguated with `.1`, `.2`, ... suffixes so column names
    /// stay unique; every row must match the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        let names = dedupe_names(headers);
        for (idx, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == names.len(),
                "row {} has {} fields, expected {}",
                idx + 2,
                row.len(),
                names.len()
            );
        }
        let row_count = rows.len();
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(col_idx, name)| {
                let raw = rows.iter().map(|row| row[col_idx].clone()).collect();
                Column::new(name, raw)
            })
            .collect();
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn missing_cell_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Number of rows that are exact duplicates of an earlier row.
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.row_count);
        let mut duplicates = 0usize;
        let mut key = String::new();
        for row in 0..self.row_count {
            key.clear();
            for column in &self.columns {
                column.row_key(row, &mut key);
            }
            if !seen.insert(key.clone()) {
                duplicates += 1;
            }
        }
        duplicates
    }

    pub fn numeric_column_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_numeric()).count()
    }
}

fn infer_values(raw: Vec<Option<String>>) -> ColumnValues {
    let numeric = raw
        .iter()
        .flatten()
        .all(|cell| cell.parse::<f64>().is_ok());
    if numeric {
        ColumnValues::Numeric(
            raw.into_iter()
                .map(|cell| cell.and_then(|v| v.parse::<f64>().ok()))
                .collect(),
        )
    } else {
        ColumnValues::Text(raw)
    }
}

fn dedupe_names(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut names = Vec::with_capacity(headers.len());
    for header in headers {
        let base = if header.is_empty() {
            format!("col_{}", names.len())
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 1usize;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn numeric_column_detected_when_all_values_parse() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![cell("1"), cell("x")],
                vec![cell("2.5"), cell("y")],
                vec![None, cell("x")],
            ],
        )
        .unwrap();
        assert!(table.column("a").unwrap().is_numeric());
        assert!(!table.column("b").unwrap().is_numeric());
        assert_eq!(table.column("a").unwrap().missing_count(), 1);
        assert_eq!(table.column("b").unwrap().distinct_count(), 2);
    }

    #[test]
    fn all_missing_column_is_numeric_with_no_values() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![None, cell("x")], vec![None, cell("y")]],
        )
        .unwrap();
        let column = table.column("a").unwrap();
        assert!(column.is_numeric());
        assert_eq!(column.missing_count(), 2);
        assert_eq!(column.distinct_count(), 0);
        assert!(column.numeric_values().unwrap().is_empty());
    }

    #[test]
    fn mixed_column_falls_back_to_text() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![cell("1"), cell("1")], vec![cell("two"), cell("2")]],
        )
        .unwrap();
        assert!(!table.column("a").unwrap().is_numeric());
        assert!(table.column("b").unwrap().is_numeric());
    }

    #[test]
    fn duplicate_headers_are_disambiguated() {
        let table = Table::from_rows(
            vec!["a".into(), "a".into(), "a".into()],
            vec![vec![cell("1"), cell("2"), cell("3")]],
        )
        .unwrap();
        let names: Vec<_> = table.columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "a.1", "a.2"]);
    }

    #[test]
    fn duplicate_rows_counted_across_types() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![cell("1"), cell("x")],
                vec![cell("1"), cell("x")],
                vec![cell("1"), cell("y")],
                vec![None, None],
                vec![None, None],
            ],
        )
        .unwrap();
        assert_eq!(table.duplicate_row_count(), 2);
    }

    #[test]
    fn empty_table_has_zero_counts() {
        let table = Table::from_rows(vec!["a".into(), "b".into()], Vec::new()).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.missing_cell_count(), 0);
        assert_eq!(table.duplicate_row_count(), 0);
    }

    #[test]
    fn mismatched_row_width_rejected() {
        let result = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![cell("1")]],
        );
        assert!(result.is_err());
    }
}
