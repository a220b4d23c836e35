//! The facility harmonisation pipeline.
//!
//! A [`Facility`] binds a category configuration, a private copy of the
//! dataset metadata and optional country hooks, and runs
//! load → prepare → format → locate → prune → save.

mod engine;
mod hooks;
mod options;

pub use engine::{Facility, HarmonisationReport};
pub use hooks::{CountryOverride, Extension, HarmoniseFn, PrepareFn};
pub use options::{FetchOptions, FormatOptions, PipelineOptions, SaveOptions};
