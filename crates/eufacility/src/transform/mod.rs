//! Value transformations applied while harmonising columns.

mod cast;

pub use cast::{CastOutcome, Caster, DEFAULT_INPUT_DATE, DEFAULT_OUTPUT_DATE, parse_float};
