//! Validation of harmonised datasets against the canonical schema.

mod observation;
mod validators;

pub use observation::{Check, Observation, Offender, Severity};
pub use validators::{
    AllowedValuesValidator, ColumnSetValidator, CompletenessValidator, CoordinateRangeValidator,
    IdentifierDuplicateValidator, TypeValidator, ValidationEngine, Validator, ensure_valid,
    validate_file,
};
