//! Canonical schema of harmonised facility datasets.

mod field;
mod registry;
mod types;

pub use field::SchemaField;
pub use registry::{GEO_QUALITY_GOOD, GEO_QUALITY_UNKNOWN, LOCATION_KEYS, SchemaRegistry};
pub use types::{AllowedValues, FacilityCategory, FieldType};
