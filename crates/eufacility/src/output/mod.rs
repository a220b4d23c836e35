//! Output formats for harmonised datasets.

mod formatters;

pub use formatters::{
    CsvFormatter, GeoJsonFormatter, JsonFormatter, OutputFormat, OutputFormatter,
    OutputGenerator, OutputLayout,
};
