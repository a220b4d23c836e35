//! Property-based tests for schema, casting and validation invariants.
//!
//! Property-based tests verify:
//! 1. **No panics**: validators and parsers never crash on any input
//! 2. **Invariants**: registry uniqueness and coordinate bounds always hold
//!
//! # Running Property Tests
//!
//! ```bash
//! PROPTEST_CASES=10000 cargo test -p eufacility --test property_tests
//! ```

use std::collections::HashSet;

use proptest::prelude::*;

use eufacility::countries::{split_at_address, split_lt_address};
use eufacility::transform::{Caster, parse_float};
use eufacility::validation::{CoordinateRangeValidator, Validator};
use eufacility::{DataTable, FieldType, SchemaRegistry, Severity, ValidationEngine, expand_countries};

// =============================================================================
// Test Strategies
// =============================================================================

/// Cell values mixing numbers, dates, nulls and free text.
fn cell_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "-?[0-9]{1,4}(\\.[0-9]{1,6})?",
        "[0-9]{2}/[0-9]{2}/[0-9]{4}",
        Just(String::new()),
        Just("NA".to_string()),
        "[a-zA-Z0-9 ,;\\-]{0,30}",
    ]
}

/// Headers drawn from canonical output names and arbitrary text.
fn header() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_string()),
        Just("hospital_name".to_string()),
        Just("lat".to_string()),
        Just("lon".to_string()),
        Just("geo_qual".to_string()),
        Just("cc".to_string()),
        Just("ref_date".to_string()),
        "[a-z_]{1,12}",
    ]
}

fn table() -> impl Strategy<Value = DataTable> {
    (prop::collection::vec(header(), 1..6), 0usize..8).prop_flat_map(|(headers, rows)| {
        let width = headers.len();
        prop::collection::vec(prop::collection::vec(cell_value(), width), rows).prop_map(
            move |rows| {
                let mut seen = HashSet::new();
                let unique: Vec<String> = headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| {
                        if seen.insert(h.clone()) {
                            h.clone()
                        } else {
                            format!("{}_{}", h, i)
                        }
                    })
                    .collect();
                DataTable::new(unique, rows)
            },
        )
    })
}

// =============================================================================
// Schema Properties
// =============================================================================

#[test]
fn prop_registries_have_unique_output_names() {
    for registry in [SchemaRegistry::healthcare(), SchemaRegistry::education()] {
        let names: Vec<&str> = registry.output_names().collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
    }
}

// =============================================================================
// Validation Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_validation_never_panics(table in table()) {
        let registry = SchemaRegistry::healthcare();
        let observations = ValidationEngine::new().validate(&table, &registry);

        // Errors sort first
        let first_non_error = observations.iter().position(|o| o.severity != Severity::Error);
        if let Some(pos) = first_non_error {
            prop_assert!(observations[pos..].iter().all(|o| o.severity != Severity::Error));
        }
    }

    #[test]
    fn prop_out_of_range_latitude_rejected(lat in 90.0001f64..10_000.0, negative in any::<bool>()) {
        let lat = (if negative { -lat } else { lat }).to_string();
        let table = DataTable::from_rows(&["lat", "lon"], &[&[lat.as_str(), "0"]]);
        let observations = CoordinateRangeValidator.validate(&table, &SchemaRegistry::healthcare());
        prop_assert!(observations.iter().any(|o| o.is_error()));
    }

    #[test]
    fn prop_in_range_coordinates_accepted(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
        let (lat, lon) = (lat.to_string(), lon.to_string());
        let table = DataTable::from_rows(&["lat", "lon"], &[&[lat.as_str(), lon.as_str()]]);
        let observations = CoordinateRangeValidator.validate(&table, &SchemaRegistry::healthcare());
        prop_assert!(observations.is_empty());
    }
}

// =============================================================================
// Casting Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_float_parse_accepts_decimal_comma(whole in -1000i32..1000, frac in 0u32..1000) {
        let dotted = format!("{}.{:03}", whole, frac);
        let comma = dotted.replace('.', ",");
        prop_assert_eq!(parse_float(&dotted), parse_float(&comma));
    }

    #[test]
    fn prop_cast_keeps_row_count(values in prop::collection::vec(cell_value(), 0..20)) {
        let rows: Vec<Vec<String>> = values.iter().map(|v| vec![v.clone()]).collect();
        let mut table = DataTable::new(vec!["v".to_string()], rows);

        for target in [FieldType::Integer, FieldType::Float, FieldType::DateTime] {
            let outcome = Caster::new().cast_column(&mut table, "v", target).unwrap();
            prop_assert_eq!(table.row_count(), values.len());
            prop_assert_eq!(outcome.fell_back(), outcome.failures > 0);
        }
    }
}

// =============================================================================
// Address and Country Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_address_split_never_panics(address in "[\\PC]{0,60}") {
        let _ = split_at_address(&address);
        let _ = split_lt_address(&address);
    }

    #[test]
    fn prop_expand_countries_is_idempotent(codes in prop::collection::vec("[A-Za-z]{2}", 0..6)) {
        let once = expand_countries(&codes);
        let twice = expand_countries(&once);
        prop_assert_eq!(once, twice);
    }
}
