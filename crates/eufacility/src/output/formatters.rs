//! Serialization of harmonised datasets.

use std::io::Write;
use std::str::FromStr;

use encoding_rs::{Encoding, UTF_8};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{FacilityError, Result};
use crate::input::DataTable;
use crate::schema::{FieldType, SchemaRegistry};
use crate::transform::parse_float;

/// Output formats a run can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    #[serde(alias = "geo_json")]
    GeoJson,
    Json,
    #[serde(alias = "geopackage")]
    Gpkg,
}

impl OutputFormat {
    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Json => "json",
            OutputFormat::Gpkg => "gpkg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FacilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "geojson" => Ok(OutputFormat::GeoJson),
            "json" => Ok(OutputFormat::Json),
            "gpkg" | "geopackage" => Ok(OutputFormat::Gpkg),
            other => Err(FacilityError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Column layout and text options shared by every formatter.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Output columns in registry order, restricted to those present.
    pub columns: Vec<String>,
    /// Output name of the latitude column.
    pub lat: String,
    /// Output name of the longitude column.
    pub lon: String,
    /// CSV separator.
    pub separator: u8,
    /// CSV text encoding.
    pub encoding: &'static Encoding,
}

impl OutputLayout {
    /// Layout of a table under a registry, with UTF-8 comma-separated text.
    pub fn new(registry: &SchemaRegistry, table: &DataTable) -> Self {
        Self {
            columns: registry
                .output_names()
                .filter(|name| table.has_column(name))
                .map(str::to_string)
                .collect(),
            lat: registry.output_name("lat").unwrap_or("lat").to_string(),
            lon: registry.output_name("lon").unwrap_or("lon").to_string(),
            separator: b',',
            encoding: UTF_8,
        }
    }

    /// Set the CSV separator.
    pub fn with_separator(mut self, separator: &str) -> Result<Self> {
        self.separator = match separator {
            "\\t" | "tab" => b'\t',
            s if s.len() == 1 && s.is_ascii() => s.as_bytes()[0],
            s => {
                return Err(FacilityError::Config(format!(
                    "unsupported output separator '{}'",
                    s
                )));
            }
        };
        Ok(self)
    }

    /// Set the CSV encoding from a label.
    pub fn with_encoding(mut self, label: &str) -> Result<Self> {
        self.encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| FacilityError::Config(format!("unknown encoding '{}'", label)))?;
        Ok(self)
    }
}

/// Produces one serialized representation of a dataset.
pub trait OutputGenerator {
    fn save(&self, writer: &mut dyn Write, table: &DataTable, layout: &OutputLayout) -> Result<()>;

    fn format(&self, table: &DataTable, layout: &OutputLayout) -> Result<Vec<u8>> {
        let mut data: Vec<u8> = Vec::new();
        self.save(&mut data, table, layout)?;
        Ok(data)
    }
}

/// One formatter per implemented output format.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Csv(CsvFormatter),
    GeoJson(GeoJsonFormatter),
    Json(JsonFormatter),
}

impl OutputFormatter {
    /// Formatter for a format. GeoPackage output is not implemented.
    pub fn for_format(format: OutputFormat) -> Result<Self> {
        match format {
            OutputFormat::Csv => Ok(OutputFormatter::Csv(CsvFormatter)),
            OutputFormat::GeoJson => Ok(OutputFormatter::GeoJson(GeoJsonFormatter)),
            OutputFormat::Json => Ok(OutputFormatter::Json(JsonFormatter)),
            OutputFormat::Gpkg => Err(FacilityError::UnsupportedFormat(
                "GeoPackage output is not implemented".to_string(),
            )),
        }
    }
}

impl OutputGenerator for OutputFormatter {
    fn save(&self, writer: &mut dyn Write, table: &DataTable, layout: &OutputLayout) -> Result<()> {
        match self {
            OutputFormatter::Csv(f) => f.save(writer, table, layout),
            OutputFormatter::GeoJson(f) => f.save(writer, table, layout),
            OutputFormatter::Json(f) => f.save(writer, table, layout),
        }
    }
}

/// Delimited text with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter;

impl OutputGenerator for CsvFormatter {
    fn save(&self, writer: &mut dyn Write, table: &DataTable, layout: &OutputLayout) -> Result<()> {
        let indices = table.ordered_indices(layout.columns.iter().map(String::as_str));

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(layout.separator)
            .from_writer(Vec::new());
        csv_writer
            .write_record(indices.iter().map(|&i| table.headers[i].as_str()))
            .map_err(serialization)?;
        for row in &table.rows {
            csv_writer
                .write_record(indices.iter().map(|&i| row[i].as_str()))
                .map_err(serialization)?;
        }
        let bytes = csv_writer
            .into_inner()
            .map_err(|e| FacilityError::Serialization(e.to_string()))?;

        if layout.encoding == UTF_8 {
            writer.write_all(&bytes).map_err(serialization)?;
        } else {
            let text = String::from_utf8_lossy(&bytes);
            let (encoded, _, unmappable) = layout.encoding.encode(&text);
            if unmappable {
                tracing::warn!(
                    encoding = layout.encoding.name(),
                    "some characters are not representable and were replaced"
                );
            }
            writer.write_all(&encoded).map_err(serialization)?;
        }
        Ok(())
    }
}

/// Flat list of records.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl OutputGenerator for JsonFormatter {
    fn save(&self, writer: &mut dyn Write, table: &DataTable, layout: &OutputLayout) -> Result<()> {
        let indices = table.ordered_indices(layout.columns.iter().map(String::as_str));
        let records: Vec<IndexMap<&str, Value>> = (0..table.row_count())
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| (table.headers[i].as_str(), typed_value(table, row, i)))
                    .collect()
            })
            .collect();
        serde_json::to_writer_pretty(writer, &records).map_err(serialization)
    }
}

/// Feature collection with one point per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonFormatter;

impl GeoJsonFormatter {
    /// Build the feature collection.
    pub fn collection(
        &self,
        table: &DataTable,
        layout: &OutputLayout,
    ) -> Result<geojson::FeatureCollection> {
        let (Some(lat_idx), Some(lon_idx)) =
            (table.column_index(&layout.lat), table.column_index(&layout.lon))
        else {
            return Err(FacilityError::Serialization(
                "geographic lat/lon columns not set".to_string(),
            ));
        };

        let properties: Vec<usize> = table
            .ordered_indices(layout.columns.iter().map(String::as_str))
            .into_iter()
            .filter(|&i| i != lat_idx && i != lon_idx)
            .collect();

        let features = (0..table.row_count())
            .map(|row| {
                let lat = table.get(row, lat_idx).and_then(parse_float);
                let lon = table.get(row, lon_idx).and_then(parse_float);
                let geometry = match (lat, lon) {
                    (Some(lat), Some(lon)) => {
                        Some(geojson::Geometry::new(geojson::Value::Point(vec![lon, lat])))
                    }
                    _ => None,
                };
                let mut props = Map::new();
                for &i in &properties {
                    props.insert(table.headers[i].clone(), typed_value(table, row, i));
                }
                geojson::Feature {
                    bbox: None,
                    geometry,
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                }
            })
            .collect();

        Ok(geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

impl OutputGenerator for GeoJsonFormatter {
    fn save(&self, writer: &mut dyn Write, table: &DataTable, layout: &OutputLayout) -> Result<()> {
        let collection = self.collection(table, layout)?;
        writer
            .write_all(collection.to_string().as_bytes())
            .map_err(serialization)
    }
}

/// JSON value of a cell according to the column's working type.
fn typed_value(table: &DataTable, row: usize, col: usize) -> Value {
    let raw = table.get(row, col).unwrap_or("");
    if DataTable::is_null_value(raw) {
        return Value::Null;
    }
    let raw = raw.trim();
    match table.dtypes[col] {
        FieldType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldType::Float => parse_float(raw)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        FieldType::Boolean => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        FieldType::String | FieldType::DateTime => Value::String(raw.to_string()),
    }
}

fn serialization(e: impl std::fmt::Display) -> FacilityError {
    FacilityError::Serialization(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harmonised() -> DataTable {
        let mut table = DataTable::from_rows(
            &["city", "lat", "hospital_name", "lon", "cap_beds"],
            &[
                &["Paris", "48.85", "Hôtel-Dieu", "2.35", "350"],
                &["Lyon", "", "Edouard Herriot", "", ""],
            ],
        );
        table.set_dtype("lat", FieldType::Float);
        table.set_dtype("lon", FieldType::Float);
        table.set_dtype("cap_beds", FieldType::Integer);
        table
    }

    #[test]
    fn test_csv_in_registry_order() {
        let table = harmonised();
        let layout = OutputLayout::new(&SchemaRegistry::healthcare(), &table)
            .with_separator(";")
            .unwrap();
        let out = String::from_utf8(CsvFormatter.format(&table, &layout).unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("hospital_name;lat;lon;city;cap_beds"));
        assert_eq!(lines.next(), Some("Hôtel-Dieu;48.85;2.35;Paris;350"));
    }

    #[test]
    fn test_csv_latin1() {
        let table = harmonised();
        let layout = OutputLayout::new(&SchemaRegistry::healthcare(), &table)
            .with_encoding("latin1")
            .unwrap();
        let out = CsvFormatter.format(&table, &layout).unwrap();
        assert!(out.contains(&0xf4)); // ô
    }

    #[test]
    fn test_geojson_points() {
        let table = harmonised();
        let layout = OutputLayout::new(&SchemaRegistry::healthcare(), &table);
        let collection = GeoJsonFormatter.collection(&table, &layout).unwrap();

        assert_eq!(collection.features.len(), 2);
        let first = &collection.features[0];
        assert_eq!(
            first.geometry.as_ref().map(|g| g.value.clone()),
            Some(geojson::Value::Point(vec![2.35, 48.85]))
        );
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props.get("cap_beds"), Some(&Value::from(350)));
        assert!(!props.contains_key("lat"));
        assert!(collection.features[1].geometry.is_none());
    }

    #[test]
    fn test_geojson_requires_coordinates() {
        let table = DataTable::from_rows(&["hospital_name"], &[&["A"]]);
        let layout = OutputLayout::new(&SchemaRegistry::healthcare(), &table);
        let err = GeoJsonFormatter.format(&table, &layout).unwrap_err();
        assert!(matches!(err, FacilityError::Serialization(_)));
    }

    #[test]
    fn test_json_records() {
        let table = harmonised();
        let layout = OutputLayout::new(&SchemaRegistry::healthcare(), &table);
        let out = JsonFormatter.format(&table, &layout).unwrap();
        let records: Vec<Map<String, Value>> = serde_json::from_slice(&out).unwrap();
        assert_eq!(records[0]["lat"], Value::from(48.85));
        assert_eq!(records[1]["lat"], Value::Null);
    }

    #[test]
    fn test_gpkg_unsupported() {
        let err = OutputFormatter::for_format(OutputFormat::Gpkg).unwrap_err();
        assert!(matches!(err, FacilityError::UnsupportedFormat(_)));
        assert_eq!("GeoJSON".parse::<OutputFormat>().unwrap(), OutputFormat::GeoJson);
    }
}
