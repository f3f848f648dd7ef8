//! In-memory listing table backed by CSV files.
//!
//! Cells are kept as strings so that columns this pipeline does not know
//! about pass through unchanged. Missing values are empty strings, which is
//! also how they are written back out.

use std::path::Path;

use crate::EnrichError;

/// A header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from headers and rows. Short rows are padded with
    /// empty cells; long rows are truncated.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Reads a CSV file with a header row.
    ///
    /// Rows shorter than the header are padded with empty cells.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Csv`] if the file cannot be opened or parsed,
    /// or [`EnrichError::RaggedRow`] if a row has more fields than the
    /// header.
    pub fn read_csv(path: &Path) -> Result<Self, EnrichError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.len() > headers.len() {
                return Err(EnrichError::RaggedRow {
                    line: record
                        .position()
                        .map_or(rows.len() as u64 + 2, csv::Position::line),
                    fields: record.len(),
                    columns: headers.len(),
                });
            }
            rows.push(record.iter().map(str::to_owned).collect());
        }

        log::debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Self::new(headers, rows))
    }

    /// Writes the table as CSV, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the directory or file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<(), EnrichError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the column named `name`, or a setup error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::MissingColumn`] if the column is absent.
    pub fn require_column(&self, name: &str) -> Result<usize, EnrichError> {
        self.column(name).ok_or_else(|| EnrichError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Returns the index of `name`, appending an empty column if needed.
    /// Existing values are cleared either way.
    pub fn reset_column(&mut self, name: &str) -> usize {
        let idx = self.column(name).unwrap_or_else(|| {
            self.headers.push(name.to_string());
            for row in &mut self.rows {
                row.push(String::new());
            }
            self.headers.len() - 1
        });
        for row in &mut self.rows {
            row[idx].clear();
        }
        idx
    }

    /// Cell value, or `None` if it is empty.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Parses a cell as a number. Empty, `NaN`, and non-numeric cells are
    /// `None`.
    #[must_use]
    pub fn get_f64(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Sets a cell; `None` clears it.
    pub fn set(&mut self, row: usize, col: usize, value: Option<String>) {
        self.rows[row][col] = value.unwrap_or_default();
    }
}
