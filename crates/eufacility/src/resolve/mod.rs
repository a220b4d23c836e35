//! Column and location resolution.

mod columns;
mod location;

pub use columns::ColumnResolver;
pub use location::{
    CoordinateOrder, DEFAULT_PLACE, GEOCODER_CRS, LocateOptions, LocationInput, LocationOutcome,
    LocationResolver, LocationStrategy,
};
