//! Findings of the dataset checks.

use serde::{Deserialize, Serialize};

/// Offending rows kept per finding.
const SAMPLE_SIZE: usize = 5;

/// Which check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Column outside the canonical schema.
    UnknownColumn,
    /// Canonical column absent from the dataset.
    MissingColumn,
    /// Canonical column without a single value.
    EmptyColumn,
    /// Values not readable as the declared type.
    TypeMismatch,
    /// Values outside the allowed set.
    NotAllowed,
    /// Identifier shared by several rows.
    DuplicateId,
    /// Latitude or longitude out of range.
    CoordinateRange,
}

impl Check {
    pub fn label(&self) -> &'static str {
        match self {
            Check::UnknownColumn => "unknown column",
            Check::MissingColumn => "missing column",
            Check::EmptyColumn => "empty column",
            Check::TypeMismatch => "type mismatch",
            Check::NotAllowed => "value not allowed",
            Check::DuplicateId => "duplicate id",
            Check::CoordinateRange => "coordinate range",
        }
    }
}

/// Severity of a finding. Errors fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A data row that failed a check, with the value found there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offender {
    /// Zero-based data row (the header is not counted).
    pub row: usize,
    pub value: String,
}

/// One finding about a column of a harmonised dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub check: Check,
    pub severity: Severity,
    /// Output column concerned.
    pub column: String,
    pub message: String,
    /// Offending rows in total; zero for column-level findings.
    #[serde(default)]
    pub count: usize,
    /// The first offending rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Offender>,
}

impl Observation {
    fn new(
        check: Check,
        severity: Severity,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check,
            severity,
            column: column.into(),
            message: message.into(),
            count: 0,
            samples: Vec::new(),
        }
    }

    pub fn error(check: Check, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(check, Severity::Error, column, message)
    }

    pub fn warning(check: Check, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(check, Severity::Warning, column, message)
    }

    /// Attach the offending rows: all are counted, the first few are kept.
    pub fn with_offenders<I>(mut self, offenders: I) -> Self
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        for (row, value) in offenders {
            self.count += 1;
            if self.samples.len() < SAMPLE_SIZE {
                self.samples.push(Offender { row, value });
            }
        }
        self
    }

    /// Whether this finding fails validation.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offenders_are_counted_and_sampled() {
        let obs = Observation::warning(Check::TypeMismatch, "cap_beds", "not an int")
            .with_offenders((0..8).map(|row| (row, format!("x{}", row))));

        assert_eq!(obs.count, 8);
        assert_eq!(obs.samples.len(), 5);
        assert_eq!(obs.samples[4], Offender { row: 4, value: "x4".into() });
        assert!(!obs.is_error());
    }

    #[test]
    fn test_error_severity() {
        let obs = Observation::error(Check::CoordinateRange, "lat", "1 latitude(s) out of [-90, 90]")
            .with_offenders([(3, "91.5".to_string())]);
        assert!(obs.is_error());
        assert_eq!(obs.count, 1);
        assert!(Severity::Warning < Severity::Error);
    }
}
