//! Persistence for metadata records - load/save JSON sidecars.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde_json::Value;

use crate::error::{FacilityError, Result};

use super::record::{METADATA_KEYS, MetadataRecord};

impl MetadataRecord {
    /// Load a record from a JSON sidecar.
    ///
    /// Unknown keys are ignored and missing keys stay unset, but a file that
    /// carries none of the recognised keys is rejected.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use eufacility::MetadataRecord;
    /// let meta = MetadataRecord::load("metadata/hcs/CZhcs.json").unwrap();
    /// println!("Country: {:?}", meta.country_code());
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            FacilityError::Metadata(format!("Failed to open file '{}': {}", path.display(), e))
        })?;

        let value: Value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            FacilityError::Metadata(format!(
                "Failed to parse metadata '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_value(value)
            .map_err(|e| FacilityError::Metadata(format!("{} ({})", e, path.display())))
    }

    /// Build a record from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(FacilityError::Metadata(
                "metadata must be a JSON object".to_string(),
            ));
        };
        if !map.keys().any(|k| METADATA_KEYS.contains(&k.as_str())) {
            return Err(FacilityError::Metadata(
                "no recognised metadata keys".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| FacilityError::Metadata(format!("invalid metadata: {}", e)))
    }

    /// Parse a record from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| FacilityError::Metadata(format!("invalid metadata JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Save the record as a pretty-printed JSON sidecar.
    ///
    /// Only recognised keys are written; saving an empty record is an error.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if self.is_empty() {
            return Err(FacilityError::Metadata(
                "no metadata to save".to_string(),
            ));
        }

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    FacilityError::Metadata(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            FacilityError::Metadata(format!(
                "Failed to create file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|e| {
            FacilityError::Metadata(format!("Failed to serialize metadata: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::schema::FacilityCategory;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("meta").join("AThcs.json");

        let record = MetadataRecord::template(FacilityCategory::Healthcare, Some("AT"));
        record.save(&path).unwrap();

        let loaded = MetadataRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_missing_file() {
        let err = MetadataRecord::load("/nonexistent/meta.json").unwrap_err();
        assert!(matches!(err, FacilityError::Metadata(_)));
    }

    #[test]
    fn test_load_rejects_unrecognised_keys() {
        let err = MetadataRecord::from_json_str(r#"{"foo": 1, "bar": 2}"#).unwrap_err();
        assert!(matches!(err, FacilityError::Metadata(_)));
        assert!(MetadataRecord::from_json_str("[1, 2]").is_err());
        assert!(MetadataRecord::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_load_partial_ignores_unknown() {
        let record =
            MetadataRecord::from_json_str(r#"{"file": "IT.csv", "unknown": true}"#).unwrap();
        assert_eq!(record.file(), Some("IT.csv"));
        assert!(record.country().is_none());
    }

    #[test]
    fn test_save_empty_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = MetadataRecord::new()
            .save(temp_dir.path().join("empty.json"))
            .unwrap_err();
        assert!(matches!(err, FacilityError::Metadata(_)));
    }
}
