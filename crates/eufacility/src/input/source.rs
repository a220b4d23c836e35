//! In-memory dataset and source descriptors.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::FieldType;

/// How a source was finally read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Delimited text read with the declared encoding and separator.
    Delimited,
    /// Spreadsheet workbook (first sheet unless one is named).
    Spreadsheet,
    /// Compressed delimited text.
    CompressedDelimited,
}

/// Metadata about a loaded source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name or URL the data came from.
    pub file: String,
    /// Full path, when the source was local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// SHA-256 hash of the raw bytes.
    pub hash: String,
    /// Raw size in bytes.
    pub size_bytes: u64,
    /// Strategy that succeeded.
    pub format: SourceFormat,
    /// Encoding used for decoding text sources.
    pub encoding: String,
    /// Separator used for delimited sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<char>,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the source was loaded.
    pub loaded_at: DateTime<Utc>,
}

/// Tabular dataset: rows of text cells plus a working type per column.
///
/// Cells are kept as strings; the per-column [`FieldType`] records what the
/// values were normalised to by the caster.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data (row-major order).
    pub rows: Vec<Vec<String>>,
    /// Working type of each column.
    pub dtypes: Vec<FieldType>,
}

impl DataTable {
    /// Create a new data table with every column typed as text.
    ///
    /// Short rows are padded and long rows truncated to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            dtypes: vec![FieldType::String; width],
            headers,
            rows,
        }
    }

    /// Build from string slices, mostly for fixtures.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Get a column by name.
    pub fn column_by_name(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }

    /// Set a specific cell value. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Working type of a column.
    pub fn dtype(&self, name: &str) -> Option<FieldType> {
        self.column_index(name).map(|i| self.dtypes[i])
    }

    /// Record the working type of a column.
    pub fn set_dtype(&mut self, name: &str, dtype: FieldType) {
        if let Some(i) = self.column_index(name) {
            self.dtypes[i] = dtype;
        }
    }

    /// Rename a column. An existing column holding the target name is replaced.
    ///
    /// Returns false when the source column does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.has_column(from);
        }
        let Some(index) = self.column_index(from) else {
            return false;
        };
        self.headers[index] = to.to_string();
        if let Some(clash) = self
            .headers
            .iter()
            .enumerate()
            .position(|(i, h)| i != index && h == to)
        {
            self.remove_at(clash);
        }
        true
    }

    /// Add a column, or overwrite an existing one, with explicit values.
    pub fn put_column(&mut self, name: &str, values: Vec<String>, dtype: FieldType) {
        let mut values = values;
        values.resize(self.row_count(), String::new());
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
                self.dtypes[index] = dtype;
            }
            None => {
                self.headers.push(name.to_string());
                self.dtypes.push(dtype);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Add a column filled with a constant value.
    pub fn fill_column(&mut self, name: &str, value: &str, dtype: FieldType) {
        let values = vec![value.to_string(); self.row_count()];
        self.put_column(name, values, dtype);
    }

    /// Copy a column under a new name. Returns false if the source is missing.
    pub fn copy_column(&mut self, from: &str, to: &str) -> bool {
        let Some(index) = self.column_index(from) else {
            return false;
        };
        let values = self.column_values(index).map(str::to_string).collect();
        let dtype = self.dtypes[index];
        self.put_column(to, values, dtype);
        true
    }

    /// Drop a column by name.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(index) => {
                self.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// Keep only the named columns, in their current order.
    pub fn retain_columns(&mut self, keep: &[&str]) {
        let mut index = self.headers.len();
        while index > 0 {
            index -= 1;
            if !keep.contains(&self.headers[index].as_str()) {
                self.remove_at(index);
            }
        }
    }

    /// Column positions following the given order, skipping absent names.
    pub fn ordered_indices<'a>(&self, order: impl IntoIterator<Item = &'a str>) -> Vec<usize> {
        order
            .into_iter()
            .filter_map(|name| self.column_index(name))
            .collect()
    }

    fn remove_at(&mut self, index: usize) {
        self.headers.remove(index);
        self.dtypes.remove(index);
        for row in &mut self.rows {
            if index < row.len() {
                row.remove(index);
            }
        }
    }

    /// Check if a value represents a missing/null value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTable {
        DataTable::from_rows(
            &["Name", "City"],
            &[&["St. Anna", "Wien"], &["LKH", "Graz"]],
        )
    }

    #[test]
    fn test_rename_and_clash() {
        let mut table = sample();
        table.fill_column("city", "x", FieldType::String);
        assert!(table.rename_column("City", "city"));
        assert_eq!(table.headers, vec!["Name", "city"]);
        assert_eq!(table.column_by_name("city").unwrap(), vec!["Wien", "Graz"]);
        assert!(!table.rename_column("Missing", "other"));
    }

    #[test]
    fn test_put_copy_and_drop() {
        let mut table = sample();
        assert!(table.copy_column("Name", "hospital_name"));
        table.fill_column("cc", "AT", FieldType::String);
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.get(1, 3), Some("AT"));
        assert!(table.drop_column("Name"));
        assert_eq!(table.headers, vec!["City", "hospital_name", "cc"]);
    }

    #[test]
    fn test_retain_columns() {
        let mut table = sample();
        table.fill_column("cc", "AT", FieldType::String);
        table.retain_columns(&["cc", "Name"]);
        assert_eq!(table.headers, vec!["Name", "cc"]);
        assert_eq!(table.dtypes.len(), 2);
        assert_eq!(table.rows[0], vec!["St. Anna", "AT"]);
    }

    #[test]
    fn test_new_pads_rows() {
        let table = DataTable::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into()]],
        );
        assert_eq!(table.rows[0], vec!["1", ""]);
        assert_eq!(table.rows[1], vec!["1", "2"]);
    }

    #[test]
    fn test_is_null_value() {
        assert!(DataTable::is_null_value(""));
        assert!(DataTable::is_null_value("NA"));
        assert!(DataTable::is_null_value("NaN"));
        assert!(DataTable::is_null_value("null"));
        assert!(!DataTable::is_null_value("0"));
        assert!(!DataTable::is_null_value("-"));
    }
}
