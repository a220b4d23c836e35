//! Pass-through options of each pipeline step.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::input::LoadOptions;
use crate::output::OutputFormat;
use crate::resolve::LocateOptions;

/// Options of the fetch step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Remote source, overriding the metadata `path`/`file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Where to keep a copy of the downloaded source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_to: Option<PathBuf>,
}

/// Options of the column formatting step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Extra canonical keys requested for this run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// Use a key as its own source column when no alias resolves.
    pub force: bool,
    /// Keep declared canonical columns even when absent, filled with nulls.
    #[serde(rename = "keep")]
    pub force_keep: bool,
    /// Reference date written to `refdate` when the source has none.
    #[serde(rename = "refdate", skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<String>,
}

/// Options of the save step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Formats to write, CSV when empty.
    #[serde(rename = "fmt", skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<OutputFormat>,
    /// Persist the final metadata next to the data.
    #[serde(rename = "dump")]
    pub dump_metadata: bool,
}

impl SaveOptions {
    /// Formats to write for this run.
    pub fn formats(&self) -> Vec<OutputFormat> {
        if self.formats.is_empty() {
            vec![OutputFormat::Csv]
        } else {
            self.formats.clone()
        }
    }
}

/// Options of every pipeline step, as found under `options` in a sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub fetch: FetchOptions,
    pub load: LoadOptions,
    /// Free-form arguments of a country `prepare` hook.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub prepare: IndexMap<String, Value>,
    pub locate: LocateOptions,
    pub format: FormatOptions,
    pub save: SaveOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_options() {
        let options: PipelineOptions = serde_json::from_str(
            r#"{
                "load": {"enc": "latin1", "sep": ";", "dtfmt": "%d.%m.%Y"},
                "locate": {"order": "Ll"},
                "format": {"keys": ["beds"], "keep": true},
                "save": {"fmt": ["csv", "geojson"], "dump": true},
                "prepare": {"drop_duplicates": true}
            }"#,
        )
        .unwrap();

        assert_eq!(options.load.date_format.as_deref(), Some("%d.%m.%Y"));
        assert_eq!(options.locate.order, crate::resolve::CoordinateOrder::LonLat);
        assert!(options.format.force_keep);
        assert_eq!(options.save.formats(), vec![OutputFormat::Csv, OutputFormat::GeoJson]);
        assert_eq!(options.prepare.get("drop_duplicates"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_default_save_format() {
        assert_eq!(SaveOptions::default().formats(), vec![OutputFormat::Csv]);
    }
}
