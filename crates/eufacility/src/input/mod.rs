//! Raw source loading and the in-memory dataset.

mod parser;
mod source;

pub use parser::{LoadOptions, LoadedSource, Parser, fingerprint};
pub use source::{DataTable, SourceFormat, SourceMetadata};
