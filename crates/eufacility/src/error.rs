//! Error types for the eufacility library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for facility harmonisation.
#[derive(Debug, Error)]
pub enum FacilityError {
    /// No source path could be resolved, or the resolved path does not exist.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Every load strategy failed for the source.
    #[error("Failed to load source '{source_name}': {reason}")]
    SourceLoad { source_name: String, reason: String },

    /// Metadata sidecar is absent, malformed or empty.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Column resolution failed (typically an unrecognised language).
    #[error("Column resolution error: {0}")]
    ColumnResolution(String),

    /// Geocoding is required but no geocoder is configured.
    #[error("Geocoding unavailable: {0}")]
    GeocodingUnavailable(String),

    /// Reprojection is required but no projection transformer is configured.
    #[error("Projection unavailable: {0}")]
    ProjectionUnavailable(String),

    /// Output could not be produced.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Output format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Harmonised data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown schema key, category or country.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator service call failed.
    #[error("Service error: {0}")]
    Service(String),
}

impl FacilityError {
    /// Whether the error aborts the current country run.
    ///
    /// Column resolution and geocoding failures degrade locally and are only
    /// reported. A missing projection transformer is fatal since skipping the
    /// reprojection would emit coordinates in the wrong reference system.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            FacilityError::ColumnResolution(_)
                | FacilityError::GeocodingUnavailable(_)
                | FacilityError::Service(_)
                | FacilityError::NotFound(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FacilityError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for facility operations.
pub type Result<T> = std::result::Result<T, FacilityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(FacilityError::SourceNotFound("x".into()).is_fatal());
        assert!(FacilityError::Serialization("x".into()).is_fatal());
        assert!(!FacilityError::ColumnResolution("x".into()).is_fatal());
        assert!(!FacilityError::GeocodingUnavailable("x".into()).is_fatal());
        assert!(FacilityError::ProjectionUnavailable("x".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = FacilityError::SourceLoad {
            source_name: "AT.csv".into(),
            reason: "no strategy succeeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load source 'AT.csv': no strategy succeeded"
        );
    }
}
