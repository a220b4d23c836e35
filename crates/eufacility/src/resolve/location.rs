//! Coordinate resolution for a dataset.
//!
//! Strategies, in priority order:
//! 1. one declared column holds both coordinates as `"lat lon"` text,
//! 2. two declared columns hold latitude and longitude,
//! 3. a place string composed from address columns is geocoded row by row.
//!
//! Coordinates are then reprojected when the input and output reference
//! systems differ, and cast to the registry types.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FacilityError, Result};
use crate::input::DataTable;
use crate::metadata::OutputIndex;
use crate::schema::{FieldType, GEO_QUALITY_GOOD, GEO_QUALITY_UNKNOWN, SchemaRegistry};
use crate::services::{Coordinate, Geocoder, Projector, TextService};
use crate::transform::{CastOutcome, Caster, parse_float};

/// Address components composing a place string, in order.
pub const DEFAULT_PLACE: [&str; 5] = ["street", "number", "postcode", "city", "country"];

/// Reference system of geocoder answers.
pub const GEOCODER_CRS: &str = "WGS84";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Order of the two values in a combined coordinate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateOrder {
    /// `"lat lon"`
    #[default]
    #[serde(alias = "lL")]
    LatLon,
    /// `"lon lat"`
    #[serde(alias = "Ll")]
    LonLat,
}

/// Options of the locate step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateOptions {
    /// Order of values in a combined coordinate field.
    pub order: CoordinateOrder,
    /// Canonical keys composing the place string (defaults to [`DEFAULT_PLACE`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Vec<String>>,
    /// Existing column holding a ready-made place string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_column: Option<String>,
}

/// Strategy chosen for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationStrategy {
    /// Split a single column.
    Combined { column: String, order: CoordinateOrder },
    /// Read two columns.
    Separate { lat: String, lon: String },
    /// Geocode a composed place string.
    Geocode { components: Vec<String> },
}

impl LocationStrategy {
    /// Choose the strategy from the declared coordinate sources.
    ///
    /// The combined strategy needs the latitude and longitude entries to name
    /// the same, existing column; two distinct existing columns are read as
    /// they are; anything else falls back to geocoding.
    pub fn choose(
        table: &DataTable,
        lat: Option<&str>,
        lon: Option<&str>,
        order: CoordinateOrder,
    ) -> Self {
        match (lat, lon) {
            (Some(lat), Some(lon)) if lat == lon && table.has_column(lat) => {
                LocationStrategy::Combined {
                    column: lat.to_string(),
                    order,
                }
            }
            (Some(lat), Some(lon)) if table.has_column(lat) && table.has_column(lon) => {
                LocationStrategy::Separate {
                    lat: lat.to_string(),
                    lon: lon.to_string(),
                }
            }
            _ => LocationStrategy::Geocode {
                components: Vec::new(),
            },
        }
    }

    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            LocationStrategy::Combined { .. } => "combined",
            LocationStrategy::Separate { .. } => "separate",
            LocationStrategy::Geocode { .. } => "geocode",
        }
    }
}

/// Declared sources and projections for one resolution.
#[derive(Debug, Clone, Copy)]
pub struct LocationInput<'r> {
    /// Source column of latitudes.
    pub lat: Option<&'r str>,
    /// Source column of longitudes.
    pub lon: Option<&'r str>,
    /// Output index, used to find place components.
    pub index: &'r OutputIndex,
    /// Reference system of the source coordinates.
    pub input_projection: Option<&'r str>,
    /// Reference system requested for output.
    pub output_projection: Option<&'r str>,
}

/// What the resolution did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationOutcome {
    pub strategy: LocationStrategy,
    /// Rows located by the geocoder.
    pub geocoded: usize,
    /// Rows the geocoder could not locate.
    pub unmatched: usize,
    /// Whether coordinates were reprojected.
    pub reprojected: bool,
    /// Casts of the coordinate columns.
    pub casts: Vec<CastOutcome>,
}

/// Resolves output latitude, longitude and geo-quality columns.
pub struct LocationResolver<'a> {
    registry: &'a SchemaRegistry,
    dataset_lang: String,
    geocoder: Option<&'a dyn Geocoder>,
    projector: Option<&'a dyn Projector>,
    text: Option<&'a dyn TextService>,
}

impl<'a> LocationResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry, dataset_lang: impl Into<String>) -> Self {
        Self {
            registry,
            dataset_lang: dataset_lang.into(),
            geocoder: None,
            projector: None,
            text: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Option<&'a dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_projector(mut self, projector: Option<&'a dyn Projector>) -> Self {
        self.projector = projector;
        self
    }

    pub fn with_text_service(mut self, text: Option<&'a dyn TextService>) -> Self {
        self.text = text;
        self
    }

    fn output(&self, key: &'static str) -> String {
        self.registry.output_name(key).unwrap_or(key).to_string()
    }

    /// Establish coordinate columns in the table.
    pub fn resolve(
        &self,
        table: &mut DataTable,
        input: LocationInput<'_>,
        options: &LocateOptions,
    ) -> Result<LocationOutcome> {
        let (olat, olon, oqual) = (self.output("lat"), self.output("lon"), self.output("geo_qual"));

        let lat = self.coordinate_source(table, input.lat, "lat");
        let lon = self.coordinate_source(table, input.lon, "lon");
        let strategy =
            LocationStrategy::choose(table, lat.as_deref(), lon.as_deref(), options.order);
        info!(strategy = strategy.label(), "resolving location");

        let mut outcome = LocationOutcome {
            strategy: strategy.clone(),
            geocoded: 0,
            unmatched: 0,
            reprojected: false,
            casts: Vec::new(),
        };

        let mut source_projection = input.input_projection.map(str::to_string);
        let qualities: Vec<String> = match &strategy {
            LocationStrategy::Combined { column, order } => {
                self.split_combined(table, column, *order, &olat, &olon);
                constant_quality(table, &olat, &olon)
            }
            LocationStrategy::Separate { lat, lon } => {
                table.rename_column(lat, &olat);
                table.rename_column(lon, &olon);
                constant_quality(table, &olat, &olon)
            }
            LocationStrategy::Geocode { .. } => {
                let geocoder = self.geocoder.ok_or_else(|| {
                    FacilityError::GeocodingUnavailable(
                        "no coordinate columns and no geocoder configured".to_string(),
                    )
                })?;
                let (components, places) = self.compose_places(table, input.index, options)?;
                outcome.strategy = LocationStrategy::Geocode { components };
                let qualities = self.geocode(table, geocoder, &places, &olat, &olon, &mut outcome)?;
                source_projection = Some(GEOCODER_CRS.to_string());
                qualities
            }
        };
        table.put_column(&oqual, qualities, FieldType::String);

        if let (Some(from), Some(to)) = (source_projection.as_deref(), input.output_projection) {
            if !same_crs(from, to) {
                self.reproject(table, from, to, &olat, &olon)?;
                outcome.reprojected = true;
            }
        }

        let caster = Caster::new();
        for (column, key) in [(&olat, "lat"), (&olon, "lon"), (&oqual, "geo_qual")] {
            let target = self
                .registry
                .get(key)
                .map(|f| f.field_type)
                .unwrap_or(FieldType::Float);
            let cast = caster.cast_column(table, column, target)?;
            if cast.fell_back() {
                warn!(column = %column, failures = cast.failures, "coordinate cast fell back to text");
            }
            outcome.casts.push(cast);
        }

        Ok(outcome)
    }

    /// Declared coordinate column, or else a column already named after the
    /// key or its output name.
    fn coordinate_source(
        &self,
        table: &DataTable,
        declared: Option<&str>,
        key: &'static str,
    ) -> Option<String> {
        if let Some(column) = declared {
            return Some(column.to_string());
        }
        [key, self.registry.output_name(key).unwrap_or(key)]
            .into_iter()
            .find(|c| table.has_column(c))
            .map(str::to_string)
    }

    fn split_combined(
        &self,
        table: &mut DataTable,
        column: &str,
        order: CoordinateOrder,
        olat: &str,
        olon: &str,
    ) {
        let (lats, lons): (Vec<String>, Vec<String>) = table
            .column_by_name(column)
            .unwrap_or_default()
            .into_iter()
            .map(|value| {
                let mut parts = WHITESPACE
                    .splitn(value.trim(), 2)
                    .map(|p| p.trim_matches(|c| c == ',' || c == ';').to_string());
                let first = parts.next().unwrap_or_default();
                let second = parts.next().unwrap_or_default();
                match order {
                    CoordinateOrder::LatLon => (first, second),
                    CoordinateOrder::LonLat => (second, first),
                }
            })
            .unzip();
        debug!(column, rows = lats.len(), "split combined coordinates");
        table.put_column(olat, lats, FieldType::String);
        table.put_column(olon, lons, FieldType::String);
    }

    /// Build one place string per row from address components.
    fn compose_places(
        &self,
        table: &DataTable,
        index: &OutputIndex,
        options: &LocateOptions,
    ) -> Result<(Vec<String>, Vec<String>)> {
        if let Some(column) = options.place_column.as_deref() {
            if let Some(values) = table.column_by_name(column) {
                let places = values.into_iter().map(|v| v.trim().to_string()).collect();
                return Ok((vec![column.to_string()], places));
            }
            warn!(column, "declared place column not found, composing place");
        }

        let keys: Vec<String> = match &options.place {
            Some(place) => place.clone(),
            None => DEFAULT_PLACE.iter().map(|k| k.to_string()).collect(),
        };
        let columns: Vec<usize> = keys
            .iter()
            .filter_map(|key| self.place_column(table, index, key))
            .collect();
        if columns.is_empty() {
            return Err(FacilityError::NotFound(format!(
                "place components {:?}",
                keys
            )));
        }

        let places = table
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|&i| row[i].trim())
                    .filter(|v| !DataTable::is_null_value(v))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();
        let names = columns.iter().map(|&i| table.headers[i].clone()).collect();
        Ok((names, places))
    }

    /// Find the dataset column holding a place component.
    fn place_column(&self, table: &DataTable, index: &OutputIndex, key: &str) -> Option<usize> {
        if let Some(i) = self.registry.output_name(key).and_then(|n| table.column_index(n)) {
            return Some(i);
        }
        if let Some(Some(source)) = index.get(key) {
            if let Some(i) = table.column_index(source) {
                return Some(i);
            }
        }
        let mut candidates = vec![key.to_string()];
        if let Some(text) = self.text {
            if self.dataset_lang != "en" {
                if let Ok(mut translated) = text.translate(&[key.to_string()], "en", &self.dataset_lang) {
                    candidates.append(&mut translated);
                }
            }
        }
        table.headers.iter().position(|h| {
            candidates
                .iter()
                .any(|c| h.trim().eq_ignore_ascii_case(c.trim()))
        })
    }

    fn geocode(
        &self,
        table: &mut DataTable,
        geocoder: &dyn Geocoder,
        places: &[String],
        olat: &str,
        olon: &str,
        outcome: &mut LocationOutcome,
    ) -> Result<Vec<String>> {
        let mut lats = Vec::with_capacity(places.len());
        let mut lons = Vec::with_capacity(places.len());
        let mut qualities = Vec::with_capacity(places.len());

        for place in places {
            let found = if place.is_empty() {
                None
            } else {
                geocoder.locate(place)?
            };
            match found {
                Some(answer) => {
                    lats.push(answer.coordinate.lat.to_string());
                    lons.push(answer.coordinate.lon.to_string());
                    qualities.push(answer.quality.unwrap_or(GEO_QUALITY_UNKNOWN).to_string());
                    outcome.geocoded += 1;
                }
                None => {
                    lats.push(String::new());
                    lons.push(String::new());
                    qualities.push(String::new());
                    outcome.unmatched += 1;
                }
            }
        }

        info!(
            geocoder = geocoder.name(),
            located = outcome.geocoded,
            unmatched = outcome.unmatched,
            "geocoding finished"
        );
        table.put_column(olat, lats, FieldType::String);
        table.put_column(olon, lons, FieldType::String);
        Ok(qualities)
    }

    fn reproject(
        &self,
        table: &mut DataTable,
        from: &str,
        to: &str,
        olat: &str,
        olon: &str,
    ) -> Result<()> {
        let projector = self
            .projector
            .filter(|p| p.supports(from, to))
            .ok_or_else(|| {
                FacilityError::ProjectionUnavailable(format!(
                    "no projection transformer available from '{}' to '{}'",
                    from, to
                ))
            })?;

        let (Some(lat_idx), Some(lon_idx)) = (table.column_index(olat), table.column_index(olon))
        else {
            return Ok(());
        };

        for row in 0..table.row_count() {
            let lat = table.get(row, lat_idx).and_then(parse_float);
            let lon = table.get(row, lon_idx).and_then(parse_float);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                let projected = projector.reproject(Coordinate::new(lat, lon), from, to)?;
                table.set(row, lat_idx, projected.lat.to_string());
                table.set(row, lon_idx, projected.lon.to_string());
            }
        }
        debug!(from, to, "reprojected coordinates");
        Ok(())
    }
}

fn constant_quality(table: &DataTable, olat: &str, olon: &str) -> Vec<String> {
    let lats = table.column_by_name(olat).unwrap_or_default();
    let lons = table.column_by_name(olon).unwrap_or_default();
    lats.iter()
        .zip(lons.iter())
        .map(|(lat, lon)| {
            if DataTable::is_null_value(lat) || DataTable::is_null_value(lon) {
                String::new()
            } else {
                GEO_QUALITY_GOOD.to_string()
            }
        })
        .collect()
}

fn same_crs(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        let s = s.trim().to_uppercase().replace([' ', '_', '-'], "");
        match s.as_str() {
            "EPSG:4326" | "4326" => "WGS84".to_string(),
            _ => s,
        }
    };
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{StaticGeocoder, WebMercatorProjector};

    fn empty_index() -> OutputIndex {
        OutputIndex::new()
    }

    fn input<'r>(index: &'r OutputIndex, lat: Option<&'r str>, lon: Option<&'r str>) -> LocationInput<'r> {
        LocationInput {
            lat,
            lon,
            index,
            input_projection: None,
            output_projection: None,
        }
    }

    #[test]
    fn test_choose_prefers_separate_over_unrelated_combined() {
        let table = DataTable::from_rows(
            &["GPS", "Lat", "Lon"],
            &[&["48.85 2.35", "48.85", "2.35"]],
        );
        let strategy = LocationStrategy::choose(&table, Some("Lat"), Some("Lon"), CoordinateOrder::LatLon);
        assert!(matches!(strategy, LocationStrategy::Separate { .. }));

        let strategy = LocationStrategy::choose(&table, Some("GPS"), Some("GPS"), CoordinateOrder::LatLon);
        assert!(matches!(strategy, LocationStrategy::Combined { .. }));

        let strategy = LocationStrategy::choose(&table, None, None, CoordinateOrder::LatLon);
        assert!(matches!(strategy, LocationStrategy::Geocode { .. }));
    }

    #[test]
    fn test_combined_lon_lat() {
        let registry = SchemaRegistry::healthcare();
        let mut table = DataTable::from_rows(&["GPS"], &[&["16.37 48.21"], &[""]]);
        let index = empty_index();
        let options = LocateOptions {
            order: CoordinateOrder::LonLat,
            ..LocateOptions::default()
        };

        let outcome = LocationResolver::new(&registry, "de")
            .resolve(&mut table, input(&index, Some("GPS"), Some("GPS")), &options)
            .unwrap();

        assert_eq!(outcome.strategy.label(), "combined");
        assert_eq!(table.column_by_name("lat").unwrap(), vec!["48.21", ""]);
        assert_eq!(table.column_by_name("lon").unwrap(), vec!["16.37", ""]);
        assert_eq!(table.column_by_name("geo_qual").unwrap(), vec!["1", ""]);
        assert_eq!(table.dtype("lat"), Some(FieldType::Float));
    }

    #[test]
    fn test_separate_renames() {
        let registry = SchemaRegistry::healthcare();
        let mut table = DataTable::from_rows(&["Lat", "Lon"], &[&["48.85", "2.35"]]);
        let index = empty_index();
        LocationResolver::new(&registry, "en")
            .resolve(&mut table, input(&index, Some("Lat"), Some("Lon")), &LocateOptions::default())
            .unwrap();
        assert_eq!(table.headers, vec!["lat", "lon", "geo_qual"]);
    }

    #[test]
    fn test_undeclared_coordinate_columns_are_read() {
        let registry = SchemaRegistry::healthcare();
        let mut table = DataTable::from_rows(&["Name", "lat", "lon"], &[&["A", "48.85", "2.35"]]);
        let index = empty_index();
        let geocoder = StaticGeocoder::new(1.0, 1.0);

        let outcome = LocationResolver::new(&registry, "en")
            .with_geocoder(Some(&geocoder))
            .resolve(&mut table, input(&index, None, None), &LocateOptions::default())
            .unwrap();

        assert_eq!(outcome.strategy.label(), "separate");
        assert_eq!(geocoder.calls(), 0);
        assert_eq!(table.column_by_name("lat").unwrap(), vec!["48.85"]);
        assert_eq!(table.column_by_name("geo_qual").unwrap(), vec!["1"]);
    }

    #[test]
    fn test_geocode_without_geocoder() {
        let registry = SchemaRegistry::healthcare();
        let mut table = DataTable::from_rows(&["City"], &[&["Paris"]]);
        let index = empty_index();
        let err = LocationResolver::new(&registry, "en")
            .resolve(&mut table, input(&index, None, None), &LocateOptions::default())
            .unwrap_err();
        assert!(matches!(err, FacilityError::GeocodingUnavailable(_)));
    }

    #[test]
    fn test_geocode_assigns_unknown_quality() {
        let registry = SchemaRegistry::healthcare();
        let mut table = DataTable::from_rows(
            &["Street", "City"],
            &[&["Rue de Rivoli", "Paris"], &["", ""]],
        );
        let geocoder = StaticGeocoder::new(48.85, 2.35);
        let index = empty_index();

        let outcome = LocationResolver::new(&registry, "fr")
            .with_geocoder(Some(&geocoder))
            .resolve(&mut table, input(&index, None, None), &LocateOptions::default())
            .unwrap();

        assert_eq!(outcome.geocoded, 1);
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(table.column_by_name("lat").unwrap(), vec!["48.85", ""]);
        assert_eq!(table.column_by_name("geo_qual").unwrap(), vec!["-1", ""]);
    }

    #[test]
    fn test_reprojection_requires_projector() {
        let registry = SchemaRegistry::healthcare();
        let index = empty_index();
        let mut table = DataTable::from_rows(&["Lat", "Lon"], &[&["48.2082", "16.3738"]]);
        let mut request = input(&index, Some("Lat"), Some("Lon"));
        request.input_projection = Some("WGS84");
        request.output_projection = Some("EPSG:3857");

        let err = LocationResolver::new(&registry, "de")
            .resolve(&mut table.clone(), request, &LocateOptions::default())
            .unwrap_err();
        assert!(matches!(err, FacilityError::ProjectionUnavailable(_)));

        let projector = WebMercatorProjector::new();
        let outcome = LocationResolver::new(&registry, "de")
            .with_projector(Some(&projector))
            .resolve(&mut table, request, &LocateOptions::default())
            .unwrap();
        assert!(outcome.reprojected);
        let x: f64 = table.column_by_name("lon").unwrap()[0].parse().unwrap();
        assert!((x - 1_822_723.0).abs() < 1.0);
    }

    #[test]
    fn test_same_crs() {
        assert!(same_crs("WGS84", "EPSG:4326"));
        assert!(same_crs("wgs 84", "WGS84"));
        assert!(!same_crs("WGS84", "EPSG:3857"));
    }
}
