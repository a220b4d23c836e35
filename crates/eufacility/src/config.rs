//! Per-category configuration: output options and the canonical schema.
//!
//! Configuration is built explicitly, either from in-code defaults or from a
//! JSON file, and shared read-only between pipeline runs.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FacilityError, Result};
use crate::output::OutputFormat;
use crate::schema::{AllowedValues, FacilityCategory, FieldType, SchemaField, SchemaRegistry};
use crate::transform::DEFAULT_OUTPUT_DATE;

/// Output options shared by every dataset of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Language of harmonised column names.
    pub lang: String,
    /// Supported formats and their file extensions.
    #[serde(rename = "fmt")]
    pub formats: IndexMap<OutputFormat, String>,
    /// Output reference system, coordinates are left as they are when unset.
    #[serde(rename = "proj")]
    pub projection: Option<String>,
    /// CSV separator.
    #[serde(rename = "sep")]
    pub separator: String,
    /// CSV encoding label.
    #[serde(rename = "enc", alias = "encoding")]
    pub encoding: String,
    /// Output date pattern.
    #[serde(rename = "date", alias = "dtfmt")]
    pub date_format: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            formats: [
                OutputFormat::Csv,
                OutputFormat::GeoJson,
                OutputFormat::Json,
                OutputFormat::Gpkg,
            ]
            .into_iter()
            .map(|f| (f, f.extension().to_string()))
            .collect(),
            projection: None,
            separator: ",".to_string(),
            encoding: "utf-8".to_string(),
            date_format: DEFAULT_OUTPUT_DATE.to_string(),
        }
    }
}

impl OutputOptions {
    /// File extension configured for a format.
    pub fn extension(&self, format: OutputFormat) -> &str {
        self.formats
            .get(&format)
            .map(String::as_str)
            .unwrap_or_else(|| format.extension())
    }
}

/// Configuration of one facility category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub category: FacilityCategory,
    /// Output directory.
    pub path: PathBuf,
    pub options: OutputOptions,
    pub registry: SchemaRegistry,
}

/// Index entry of a configuration file.
#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    desc: String,
    #[serde(rename = "type", default)]
    field_type: FieldType,
    /// Allowed values, written as strings or numbers.
    #[serde(default)]
    values: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    options: Option<OutputOptions>,
    #[serde(default)]
    index: Option<IndexMap<String, IndexEntry>>,
}

/// Text form of an allowed value; values are compared as text.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl CategoryConfig {
    /// Built-in configuration of a category.
    pub fn default_for(category: FacilityCategory) -> Self {
        let registry = match category {
            FacilityCategory::Healthcare => SchemaRegistry::healthcare(),
            FacilityCategory::Education => SchemaRegistry::education(),
        };
        Self {
            category,
            path: PathBuf::from("data"),
            options: OutputOptions::default(),
            registry,
        }
    }

    /// Load a configuration file. Sections absent from the file keep the
    /// built-in defaults.
    pub fn load(category: FacilityCategory, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FacilityError::io(path, e))?;
        let parsed: ConfigFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            FacilityError::Config(format!("invalid configuration {}: {}", path.display(), e))
        })?;

        let mut config = Self::default_for(category);
        if let Some(dir) = parsed.path {
            config.path = dir;
        }
        if let Some(options) = parsed.options {
            config.options = options;
        }
        if let Some(index) = parsed.index {
            config.registry = SchemaRegistry::new(index.into_iter().map(|(key, entry)| {
                let mut field = SchemaField::new(key, entry.field_type)
                    .with_description(entry.desc);
                if let Some(name) = entry.name {
                    field = field.with_output_name(name);
                }
                if let Some(values) = entry.values {
                    field.allowed = Some(AllowedValues::set(values.iter().map(value_text)));
                } else if let Some(pattern) = entry.pattern {
                    field = field.with_pattern(pattern);
                }
                field
            }))?;
        }
        Ok(config)
    }

    /// Set the output directory.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Output file of a country dataset: `<path>/<fmt>/<CC>_<cat>.<ext>`.
    pub fn output_file(&self, country: &str, format: OutputFormat) -> PathBuf {
        self.path.join(format.extension()).join(format!(
            "{}_{}.{}",
            country.to_uppercase(),
            self.category.code(),
            self.options.extension(format)
        ))
    }

    /// Metadata dump of a country dataset: `<path>/metadata/<CC><cat>.json`.
    pub fn metadata_file(&self, country: &str) -> PathBuf {
        self.path.join("metadata").join(format!(
            "{}{}.json",
            country.to_uppercase(),
            self.category.code()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = CategoryConfig::default_for(FacilityCategory::Education);
        assert_eq!(config.options.lang, "en");
        assert_eq!(config.options.extension(OutputFormat::GeoJson), "geojson");
        assert!(config.registry.contains("students"));
        assert_eq!(
            config.output_file("at", OutputFormat::Csv),
            PathBuf::from("data/csv/AT_edu.csv")
        );
        assert_eq!(
            config.metadata_file("AT"),
            PathBuf::from("data/metadata/ATedu.json")
        );
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "path": "out",
                "options": {{"lang": "fr", "sep": ";", "enc": "latin1"}},
                "index": {{
                    "id": {{"type": "int"}},
                    "name": {{"name": "hospital_name", "type": "str"}},
                    "ER": {{"name": "emergency", "type": "str", "values": ["yes", "no"]}}
                }}
            }}"#
        )
        .unwrap();

        let config = CategoryConfig::load(FacilityCategory::Healthcare, file.path()).unwrap();
        assert_eq!(config.path, PathBuf::from("out"));
        assert_eq!(config.options.lang, "fr");
        assert_eq!(config.options.date_format, DEFAULT_OUTPUT_DATE);
        assert_eq!(config.registry.len(), 3);
        assert!(config.registry.lookup("ER").unwrap().allowed.is_some());
    }

    #[test]
    fn test_load_numeric_allowed_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"index": {{"geo_qual": {{"type": "int", "values": [-1, 1, 2, 3]}}}}}}"#
        )
        .unwrap();

        let config = CategoryConfig::load(FacilityCategory::Healthcare, file.path()).unwrap();
        let allowed = config.registry.lookup("geo_qual").unwrap().allowed.clone().unwrap();
        assert!(allowed.admits("-1"));
        assert!(allowed.admits("3"));
        assert!(!allowed.admits("4"));
    }

    #[test]
    fn test_load_rejects_duplicate_output_names() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"index": {{"a": {{"name": "x"}}, "b": {{"name": "x"}}}}}}"#
        )
        .unwrap();
        let err = CategoryConfig::load(FacilityCategory::Healthcare, file.path()).unwrap_err();
        assert!(matches!(err, FacilityError::Config(_)));
    }
}
