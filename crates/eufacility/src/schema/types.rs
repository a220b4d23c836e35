//! Core type definitions for canonical facility fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FacilityError, Result};

/// Semantic type of a canonical field, and the working type of a dataset column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Whole numbers.
    #[serde(rename = "int", alias = "integer")]
    Integer,
    /// Floating-point numbers.
    #[serde(rename = "float")]
    Float,
    /// Free text. Also the fallback type of a column whose cast failed.
    #[default]
    #[serde(rename = "str", alias = "string", alias = "object")]
    String,
    /// Boolean values.
    #[serde(rename = "bool", alias = "boolean")]
    Boolean,
    /// Dates, parsed with an input pattern and written with an output pattern.
    #[serde(rename = "datetime", alias = "date")]
    DateTime,
}

impl FieldType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }

    /// Short name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "int",
            FieldType::Float => "float",
            FieldType::String => "str",
            FieldType::Boolean => "bool",
            FieldType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Constraint on the values a canonical field may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedValues {
    /// Closed set of admissible values, compared as text.
    Set(Vec<String>),
    /// Date pattern (strftime syntax) the field is written with.
    Pattern(String),
}

impl AllowedValues {
    /// Build a value set from anything string-like.
    pub fn set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowedValues::Set(values.into_iter().map(Into::into).collect())
    }

    /// Check a (non-null) value against the constraint. Patterns are not
    /// checked here; date conformance is the job of the caster.
    pub fn admits(&self, value: &str) -> bool {
        match self {
            AllowedValues::Set(values) => values.iter().any(|v| v == value.trim()),
            AllowedValues::Pattern(_) => true,
        }
    }
}

/// Facility category, each with its own canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    /// Healthcare services (hospitals).
    #[serde(alias = "hcs")]
    Healthcare,
    /// Education services (schools).
    #[serde(alias = "edu")]
    Education,
}

impl FacilityCategory {
    /// All supported categories.
    pub const ALL: [FacilityCategory; 2] = [FacilityCategory::Healthcare, FacilityCategory::Education];

    /// Short code used in file names (`hcs`, `edu`).
    pub fn code(&self) -> &'static str {
        match self {
            FacilityCategory::Healthcare => "hcs",
            FacilityCategory::Education => "edu",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FacilityCategory::Healthcare => "healthcare",
            FacilityCategory::Education => "education",
        }
    }
}

impl fmt::Display for FacilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FacilityCategory {
    type Err = FacilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hcs" | "healthcare" | "health" => Ok(FacilityCategory::Healthcare),
            "edu" | "education" => Ok(FacilityCategory::Education),
            other => Err(FacilityError::NotFound(format!(
                "facility category '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_serde_names() {
        let t: FieldType = serde_json::from_str("\"int\"").unwrap();
        assert_eq!(t, FieldType::Integer);
        let t: FieldType = serde_json::from_str("\"object\"").unwrap();
        assert_eq!(t, FieldType::String);
        assert_eq!(serde_json::to_string(&FieldType::DateTime).unwrap(), "\"datetime\"");
        assert_eq!(FieldType::default(), FieldType::String);
    }

    #[test]
    fn test_allowed_values_admits() {
        let allowed = AllowedValues::set(["yes", "no"]);
        assert!(allowed.admits("yes"));
        assert!(allowed.admits(" no "));
        assert!(!allowed.admits("maybe"));
        assert!(AllowedValues::Pattern("%d/%m/%Y".into()).admits("anything"));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("hcs".parse::<FacilityCategory>().unwrap(), FacilityCategory::Healthcare);
        assert_eq!("Education".parse::<FacilityCategory>().unwrap(), FacilityCategory::Education);
        assert!("transport".parse::<FacilityCategory>().is_err());
    }
}
