//! Canonical field definition.

use serde::{Deserialize, Serialize};

use super::types::{AllowedValues, FieldType};

/// One canonical field of a facility schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Canonical key (e.g. `beds`).
    pub key: String,
    /// Column name in harmonised output (e.g. `cap_beds`).
    #[serde(rename = "name")]
    pub output_name: String,
    /// Semantic type the column is cast to.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Short description.
    #[serde(rename = "desc", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Optional value constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<AllowedValues>,
}

impl SchemaField {
    /// Create a field whose output name equals its key.
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        let key = key.into();
        Self {
            output_name: key.clone(),
            key,
            field_type,
            description: String::new(),
            allowed: None,
        }
    }

    /// Set the output column name.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restrict values to a closed set.
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(AllowedValues::set(values));
        self
    }

    /// Declare the output date pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed = Some(AllowedValues::Pattern(pattern.into()));
        self
    }

    /// Output date pattern, if declared.
    pub fn date_pattern(&self) -> Option<&str> {
        match &self.allowed {
            Some(AllowedValues::Pattern(p)) => Some(p),
            _ => None,
        }
    }
}
