//! Column casting to canonical field types.
//!
//! A cast is all-or-nothing per column: if any non-null value fails to
//! convert, the column keeps its original text and is typed as a string.

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FacilityError, Result};
use crate::input::DataTable;
use crate::schema::FieldType;

/// Input pattern assumed for dates when the source declares none.
pub const DEFAULT_INPUT_DATE: &str = "%Y-%m-%d";

/// Output pattern used when the category declares none.
pub const DEFAULT_OUTPUT_DATE: &str = "%d/%m/%Y";

/// Result of casting one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastOutcome {
    /// Column that was cast.
    pub column: String,
    /// Requested type.
    pub target: FieldType,
    /// Type the column ended up with.
    pub applied: FieldType,
    /// Number of values rewritten.
    pub values_changed: usize,
    /// Number of values that could not be converted.
    pub failures: usize,
    /// A few offending values, for reporting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl CastOutcome {
    /// Whether the cast degraded to text.
    pub fn fell_back(&self) -> bool {
        self.applied != self.target
    }
}

/// Casts dataset columns to field types.
#[derive(Debug, Clone)]
pub struct Caster {
    input_date: String,
    output_date: String,
}

impl Caster {
    /// Create a caster with default date patterns.
    pub fn new() -> Self {
        Self {
            input_date: DEFAULT_INPUT_DATE.to_string(),
            output_date: DEFAULT_OUTPUT_DATE.to_string(),
        }
    }

    /// Set the date pattern of the source data.
    pub fn with_input_date(mut self, pattern: impl Into<String>) -> Self {
        self.input_date = pattern.into();
        self
    }

    /// Set the date pattern written to output.
    pub fn with_output_date(mut self, pattern: impl Into<String>) -> Self {
        self.output_date = pattern.into();
        self
    }

    /// Cast a column in place.
    pub fn cast_column(
        &self,
        table: &mut DataTable,
        column: &str,
        target: FieldType,
    ) -> Result<CastOutcome> {
        let col_idx = table
            .column_index(column)
            .ok_or_else(|| FacilityError::NotFound(format!("column '{}'", column)))?;

        let mut converted = Vec::with_capacity(table.row_count());
        let mut failures = 0;
        let mut samples = Vec::new();

        for value in table.column_values(col_idx) {
            if DataTable::is_null_value(value) {
                converted.push(String::new());
                continue;
            }
            match self.convert(value.trim(), target) {
                Some(new_value) => converted.push(new_value),
                None => {
                    failures += 1;
                    if samples.len() < 5 {
                        samples.push(value.to_string());
                    }
                    converted.push(value.to_string());
                }
            }
        }

        if failures > 0 {
            table.dtypes[col_idx] = FieldType::String;
            return Ok(CastOutcome {
                column: column.to_string(),
                target,
                applied: FieldType::String,
                values_changed: 0,
                failures,
                samples,
            });
        }

        let mut changed = 0;
        for (row_idx, new_value) in converted.into_iter().enumerate() {
            if table.get(row_idx, col_idx) != Some(new_value.as_str()) {
                table.set(row_idx, col_idx, new_value);
                changed += 1;
            }
        }
        table.dtypes[col_idx] = target;

        Ok(CastOutcome {
            column: column.to_string(),
            target,
            applied: target,
            values_changed: changed,
            failures: 0,
            samples,
        })
    }

    /// Convert one non-null value, `None` when it does not fit the type.
    pub fn convert(&self, trimmed: &str, target: FieldType) -> Option<String> {
        match target {
            FieldType::Integer => {
                if let Ok(i) = trimmed.parse::<i64>() {
                    Some(i.to_string())
                } else {
                    // Whole floats are accepted as integers
                    parse_float(trimmed)
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| format!("{}", f as i64))
                }
            }
            FieldType::Float => parse_float(trimmed).map(|f| format!("{}", f)),
            FieldType::Boolean => {
                let lower = trimmed.to_lowercase();
                match lower.as_str() {
                    "true" | "yes" | "1" | "t" | "y" => Some("true".to_string()),
                    "false" | "no" | "0" | "f" | "n" => Some("false".to_string()),
                    _ => None,
                }
            }
            FieldType::DateTime => self.convert_date(trimmed),
            FieldType::String => Some(trimmed.to_string()),
        }
    }

    fn convert_date(&self, trimmed: &str) -> Option<String> {
        let parsed = NaiveDateTime::parse_from_str(trimmed, &self.input_date)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, &self.input_date)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;

        // Patterns with unsupported specifiers fail at format time, not parse time
        let mut out = String::new();
        write!(out, "{}", parsed.format(&self.output_date)).ok()?;
        Some(out)
    }
}

impl Default for Caster {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a float, accepting a decimal comma when no dot is present.
pub fn parse_float(value: &str) -> Option<f64> {
    let value = value.trim();
    let parsed = if value.contains(',') && !value.contains('.') {
        value.replace(',', ".").parse::<f64>()
    } else {
        value.parse::<f64>()
    };
    parsed.ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: &[&str]) -> DataTable {
        let rows: Vec<Vec<String>> = values.iter().map(|v| vec![v.to_string()]).collect();
        DataTable::new(vec!["col".to_string()], rows)
    }

    #[test]
    fn test_integer_cast() {
        let mut data = table(&["12", "3.0", "", "NA"]);
        let outcome = Caster::new()
            .cast_column(&mut data, "col", FieldType::Integer)
            .unwrap();
        assert!(!outcome.fell_back());
        assert_eq!(data.column_by_name("col").unwrap(), vec!["12", "3", "", ""]);
        assert_eq!(data.dtype("col"), Some(FieldType::Integer));
    }

    #[test]
    fn test_integer_fallback_keeps_text() {
        let mut data = table(&["12", "+43 1 40400"]);
        let outcome = Caster::new()
            .cast_column(&mut data, "col", FieldType::Integer)
            .unwrap();
        assert!(outcome.fell_back());
        assert_eq!(outcome.failures, 1);
        assert_eq!(data.column_by_name("col").unwrap(), vec!["12", "+43 1 40400"]);
        assert_eq!(data.dtype("col"), Some(FieldType::String));
    }

    #[test]
    fn test_float_cast_with_decimal_comma() {
        let mut data = table(&["48,85", "2.35"]);
        Caster::new()
            .cast_column(&mut data, "col", FieldType::Float)
            .unwrap();
        assert_eq!(data.column_by_name("col").unwrap(), vec!["48.85", "2.35"]);
    }

    #[test]
    fn test_date_cast() {
        let mut data = table(&["01-02-2020"]);
        Caster::new()
            .with_input_date("%d-%m-%Y")
            .with_output_date("%Y/%m/%d")
            .cast_column(&mut data, "col", FieldType::DateTime)
            .unwrap();
        assert_eq!(data.get(0, 0), Some("2020/02/01"));
    }

    #[test]
    fn test_malformed_date_is_retained() {
        let mut data = table(&["31-02-2020"]);
        let outcome = Caster::new()
            .with_input_date("%d-%m-%Y")
            .cast_column(&mut data, "col", FieldType::DateTime)
            .unwrap();
        assert!(outcome.fell_back());
        assert_eq!(data.get(0, 0), Some("31-02-2020"));
    }

    #[test]
    fn test_boolean_cast() {
        let caster = Caster::new();
        assert_eq!(caster.convert("Yes", FieldType::Boolean), Some("true".into()));
        assert_eq!(caster.convert("0", FieldType::Boolean), Some("false".into()));
        assert_eq!(caster.convert("maybe", FieldType::Boolean), None);
    }

    #[test]
    fn test_unknown_column() {
        let mut data = table(&["1"]);
        assert!(Caster::new().cast_column(&mut data, "missing", FieldType::Integer).is_err());
    }
}
