//! Textual dataset consumed by the classifier runtime.
//!
//! A dataset is comma-separated text: a header line naming the columns, then
//! one line per row. A cell holding `?` is missing. The last column is the
//! class attribute, which is missing in every row handed over for inference.

use snafu::Snafu;

/// Errors raised while parsing a textual dataset.
#[derive(Debug, Snafu)]
pub enum DatasetError {
    /// The text has no header line.
    #[snafu(display("Dataset has no header"))]
    NoHeader,

    /// A header cell is empty or repeated.
    #[snafu(display("Dataset header is invalid: {message}"))]
    Header {
        /// What is wrong with the header.
        message: String,
    },

    /// A row has a different number of cells than the header.
    #[snafu(display("Dataset row {row} has {found} cells, header has {expected}"))]
    Width {
        /// Zero-based row index.
        row: usize,
        /// Header width.
        expected: usize,
        /// Row width.
        found: usize,
    },
}

/// Token marking a missing cell.
pub const MISSING: &str = "?";

/// One dataset cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Cell text, interpreted by the split that reads it.
    Value(String),
    /// The cell held [`MISSING`].
    Missing,
}

/// A parsed dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Parses dataset text. Blank lines are ignored and cells are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if there is no header, a header cell is empty
    /// or repeated, or a row's width differs from the header's.
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let header = lines.next().ok_or(DatasetError::NoHeader)?;

        let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
        for (index, column) in columns.iter().enumerate() {
            if column.is_empty() {
                let message = format!("column {index} has no name");
                return Err(DatasetError::Header { message });
            }
            if columns[..index].contains(column) {
                let message = format!("column {column} appears twice");
                return Err(DatasetError::Header { message });
            }
        }

        let mut rows = Vec::new();
        for (row, line) in lines.enumerate() {
            let cells: Vec<Cell> = line
                .split(',')
                .map(|cell| match cell.trim() {
                    MISSING => Cell::Missing,
                    text => Cell::Value(text.to_string()),
                })
                .collect();
            if cells.len() != columns.len() {
                return Err(DatasetError::Width {
                    row,
                    expected: columns.len(),
                    found: cells.len(),
                });
            }
            rows.push(cells);
        }

        Ok(Self { columns, rows })
    }

    /// Column names in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The class attribute (last column).
    pub fn class_attribute(&self) -> &str {
        self.columns.last().map_or("", String::as_str)
    }

    /// Parsed rows; every row is as wide as the header.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
}
