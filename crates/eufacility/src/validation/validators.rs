//! Validators for checking harmonised datasets against the canonical schema.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{FacilityError, Result};
use crate::input::{DataTable, LoadOptions, Parser};
use crate::schema::{FieldType, SchemaField, SchemaRegistry};
use crate::transform::{Caster, DEFAULT_OUTPUT_DATE, parse_float};

use super::observation::{Check, Observation};

/// Trait for validators.
pub trait Validator {
    /// Run validation and return observations.
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation>;
}

/// Canonical fields present in the table, with their column positions.
fn present_fields<'r>(
    table: &DataTable,
    registry: &'r SchemaRegistry,
) -> Vec<(usize, &'r SchemaField)> {
    registry
        .fields()
        .filter_map(|field| table.column_index(&field.output_name).map(|i| (i, field)))
        .collect()
}

/// Non-null cells of a column failing a predicate, as `(row, trimmed value)`.
fn offenders<F>(table: &DataTable, col_idx: usize, fails: F) -> Vec<(usize, String)>
where
    F: Fn(&str) -> bool,
{
    table
        .column_values(col_idx)
        .enumerate()
        .filter(|(_, value)| !DataTable::is_null_value(value))
        .map(|(row, value)| (row, value.trim()))
        .filter(|(_, value)| fails(value))
        .map(|(row, value)| (row, value.to_string()))
        .collect()
}

/// Checks the column set: unknown columns are errors, missing canonical
/// columns are warnings.
pub struct ColumnSetValidator;

impl Validator for ColumnSetValidator {
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        let unknown = table
            .headers
            .iter()
            .filter(|header| registry.by_output_name(header).is_none())
            .map(|header| {
                Observation::error(Check::UnknownColumn, header.as_str(), "not a canonical column")
            });
        let missing = registry
            .output_names()
            .filter(|name| !table.has_column(name))
            .map(|name| {
                Observation::warning(Check::MissingColumn, name, "absent from the dataset")
            });
        unknown.chain(missing).collect()
    }
}

/// Flags canonical columns that hold no value at all.
pub struct CompletenessValidator;

impl Validator for CompletenessValidator {
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        if table.row_count() == 0 {
            return Vec::new();
        }

        present_fields(table, registry)
            .into_iter()
            .filter(|(idx, _)| table.column_values(*idx).all(DataTable::is_null_value))
            .map(|(_, field)| {
                Observation::warning(
                    Check::EmptyColumn,
                    &field.output_name,
                    format!("no value in {} row(s)", table.row_count()),
                )
            })
            .collect()
    }
}

/// Validates that values match their declared type.
pub struct TypeValidator {
    caster: Caster,
}

impl TypeValidator {
    /// Validator reading dates with the given output pattern.
    pub fn new(date_pattern: impl Into<String>) -> Self {
        let pattern = date_pattern.into();
        Self {
            caster: Caster::new()
                .with_input_date(pattern.clone())
                .with_output_date(pattern),
        }
    }
}

impl Default for TypeValidator {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DATE)
    }
}

impl Validator for TypeValidator {
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        present_fields(table, registry)
            .into_iter()
            .filter(|(_, field)| field.field_type != FieldType::String)
            .filter_map(|(col_idx, field)| {
                let caster = match field.date_pattern() {
                    Some(pattern) => self.caster.clone().with_input_date(pattern),
                    None => self.caster.clone(),
                };
                let bad = offenders(table, col_idx, |value| {
                    caster.convert(value, field.field_type).is_none()
                });
                (!bad.is_empty()).then(|| {
                    Observation::warning(
                        Check::TypeMismatch,
                        &field.output_name,
                        format!("{} value(s) are not of type {}", bad.len(), field.field_type),
                    )
                    .with_offenders(bad)
                })
            })
            .collect()
    }
}

/// Validates that values are in the allowed set.
pub struct AllowedValuesValidator;

impl Validator for AllowedValuesValidator {
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        present_fields(table, registry)
            .into_iter()
            .filter_map(|(col_idx, field)| {
                let allowed = field.allowed.as_ref()?;
                let bad = offenders(table, col_idx, |value| !allowed.admits(value));
                (!bad.is_empty()).then(|| {
                    Observation::error(
                        Check::NotAllowed,
                        &field.output_name,
                        format!("{} value(s) outside the allowed set", bad.len()),
                    )
                    .with_offenders(bad)
                })
            })
            .collect()
    }
}

/// Validates the identifier column for duplicates.
pub struct IdentifierDuplicateValidator;

impl Validator for IdentifierDuplicateValidator {
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        let Some(column) = registry.output_name("id") else {
            return Vec::new();
        };
        let Some(col_idx) = table.column_index(column) else {
            return Vec::new();
        };

        // Every row repeating an identifier seen on an earlier row
        let mut seen = HashSet::new();
        let repeated: Vec<(usize, String)> = table
            .column_values(col_idx)
            .enumerate()
            .filter(|(_, value)| !DataTable::is_null_value(value))
            .map(|(row, value)| (row, value.trim()))
            .filter(|(_, id)| !seen.insert(*id))
            .map(|(row, id)| (row, id.to_string()))
            .collect();

        if repeated.is_empty() {
            return Vec::new();
        }
        vec![
            Observation::error(Check::DuplicateId, column, "Duplicated identifier")
                .with_offenders(repeated),
        ]
    }
}

/// Rejects latitudes outside [-90, 90] and longitudes outside [-180, 180].
pub struct CoordinateRangeValidator;

impl CoordinateRangeValidator {
    fn check_column(
        &self,
        table: &DataTable,
        column: &str,
        label: &str,
        bound: f64,
    ) -> Option<Observation> {
        let col_idx = table.column_index(column)?;
        let bad = offenders(table, col_idx, |value| {
            parse_float(value).is_some_and(|v| v.abs() > bound)
        });
        (!bad.is_empty()).then(|| {
            Observation::error(
                Check::CoordinateRange,
                column,
                format!("{} {}(s) out of [-{}, {}]", bad.len(), label, bound, bound),
            )
            .with_offenders(bad)
        })
    }
}

impl Validator for CoordinateRangeValidator {
    fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        let lat = registry.output_name("lat").unwrap_or("lat");
        let lon = registry.output_name("lon").unwrap_or("lon");
        self.check_column(table, lat, "latitude", 90.0)
            .into_iter()
            .chain(self.check_column(table, lon, "longitude", 180.0))
            .collect()
    }
}

/// Composite validator that runs all validators.
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Create a new validation engine with all default validators.
    pub fn new() -> Self {
        Self::with_date_pattern(DEFAULT_OUTPUT_DATE)
    }

    /// Engine whose type checks read dates with the given pattern.
    pub fn with_date_pattern(pattern: impl Into<String>) -> Self {
        Self {
            validators: vec![
                Box::new(ColumnSetValidator),
                Box::new(IdentifierDuplicateValidator),
                Box::new(AllowedValuesValidator),
                Box::new(CoordinateRangeValidator),
                Box::new(CompletenessValidator),
                Box::new(TypeValidator::new(pattern)),
            ],
        }
    }

    /// Run all validators and collect observations.
    pub fn validate(&self, table: &DataTable, registry: &SchemaRegistry) -> Vec<Observation> {
        let mut all_observations = Vec::new();

        for validator in &self.validators {
            let observations = validator.validate(table, registry);
            all_observations.extend(observations);
        }

        // Sort by severity (errors first)
        all_observations.sort_by(|a, b| b.severity.cmp(&a.severity));

        all_observations
    }

    /// Validate and fail on the first error observation.
    pub fn check(&self, table: &DataTable, registry: &SchemaRegistry) -> Result<Vec<Observation>> {
        ensure_valid(self.validate(table, registry))
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn the first error observation into a `Validation` error.
pub fn ensure_valid(observations: Vec<Observation>) -> Result<Vec<Observation>> {
    match observations.iter().find(|o| o.is_error()) {
        Some(error) => Err(FacilityError::Validation(error.message.clone())),
        None => Ok(observations),
    }
}

/// Load a harmonised file and run every validator on it.
pub fn validate_file(
    path: impl AsRef<Path>,
    registry: &SchemaRegistry,
    options: &LoadOptions,
) -> Result<Vec<Observation>> {
    let loaded = Parser::with_options(options.clone()).load_path(path)?;
    let engine = match &options.date_format {
        Some(pattern) => ValidationEngine::with_date_pattern(pattern.clone()),
        None => ValidationEngine::new(),
    };
    Ok(engine.validate(&loaded.table, registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::from_rows(headers, rows)
    }

    #[test]
    fn test_column_set_validator() {
        let table = make_table(&["hospital_name", "Extra"], &[&["A", "x"]]);
        let observations = ColumnSetValidator.validate(&table, &SchemaRegistry::healthcare());

        let unknown: Vec<_> = observations
            .iter()
            .filter(|o| o.check == Check::UnknownColumn)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].column, "Extra");
        assert!(unknown[0].is_error());
        assert!(observations
            .iter()
            .any(|o| o.check == Check::MissingColumn && o.column == "lat"));
    }

    #[test]
    fn test_duplicate_identifier() {
        let table = make_table(
            &["id", "hospital_name"],
            &[&["1", "A"], &["1", "B"], &["2", "C"], &["1", "D"]],
        );
        let observations = IdentifierDuplicateValidator.validate(&table, &SchemaRegistry::healthcare());
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].count, 2);
        assert_eq!(observations[0].samples[0].row, 1);
        assert_eq!(observations[0].samples[1].row, 3);

        let err = ValidationEngine::new()
            .check(&table, &SchemaRegistry::healthcare())
            .unwrap_err();
        assert!(matches!(err, FacilityError::Validation(ref msg) if msg == "Duplicated identifier"));
    }

    #[test]
    fn test_coordinate_ranges() {
        let table = make_table(&["lat", "lon"], &[&["91.5", "2.35"], &["48.85", "-181"]]);
        let observations = CoordinateRangeValidator.validate(&table, &SchemaRegistry::healthcare());
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().all(|o| o.is_error()));
        assert_eq!(observations[0].samples[0].value, "91.5");
        assert_eq!(observations[1].samples[0].row, 1);

        let err = ValidationEngine::new()
            .check(&table, &SchemaRegistry::healthcare())
            .unwrap_err();
        assert!(matches!(err, FacilityError::Validation(_)));
    }

    #[test]
    fn test_allowed_values() {
        let table = make_table(&["emergency", "public_private"], &[&["yes", "public"], &["maybe", ""]]);
        let observations = AllowedValuesValidator.validate(&table, &SchemaRegistry::healthcare());
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].column, "emergency");
        assert_eq!(observations[0].samples[0].value, "maybe");
    }

    #[test]
    fn test_type_validator() {
        let table = make_table(
            &["cap_beds", "ref_date"],
            &[&["25", "01/02/2020"], &["many", "2020-02-01"]],
        );
        let observations = TypeValidator::default().validate(&table, &SchemaRegistry::healthcare());
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().all(|o| !o.is_error() && o.count == 1));
    }

    #[test]
    fn test_empty_column_is_warning() {
        let table = make_table(&["hospital_name", "city"], &[&["A", ""], &["B", "NA"]]);
        let observations = CompletenessValidator.validate(&table, &SchemaRegistry::healthcare());
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].column, "city");
    }

    #[test]
    fn test_clean_dataset_passes() {
        let table = make_table(
            &["id", "hospital_name", "lat", "lon", "geo_qual", "cc"],
            &[&["1", "A", "48.85", "2.35", "1", "FR"]],
        );
        let observations = ValidationEngine::new()
            .check(&table, &SchemaRegistry::healthcare())
            .unwrap();
        assert!(observations.iter().all(|o| !o.is_error()));
    }
}
