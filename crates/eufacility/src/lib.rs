//! eufacility: harmonisation of European healthcare and education facility
//! datasets.
//!
//! Raw per-country tables are loaded, their columns are renamed and cast
//! against a fixed pan-European schema, coordinates are resolved (from
//! coordinate columns or through a geocoder) and the result is written as
//! CSV, GeoJSON or JSON along with an updated metadata sidecar.
//!
//! # Core Principles
//!
//! - **Explicit configuration**: nothing is read at import time, every run is
//!   driven by a [`CategoryConfig`] and a [`MetadataRecord`]
//! - **Isolated runs**: each [`Facility`] owns a private copy of its metadata
//! - **Degrade, don't abort**: column and location failures are reported and
//!   the run continues with what it has
//!
//! # Example
//!
//! ```no_run
//! use eufacility::{CategoryConfig, FacilityCategory, Harmoniser};
//!
//! let config = CategoryConfig::default_for(FacilityCategory::Healthcare);
//! let harmoniser = Harmoniser::new(config).with_metadata_dir("metadata");
//! let report = harmoniser.harmonise("AT").unwrap();
//!
//! println!("Rows: {}", report.rows);
//! println!("Written: {:?}", report.written);
//! ```

pub mod config;
pub mod countries;
pub mod error;
pub mod facility;
pub mod input;
pub mod metadata;
pub mod output;
pub mod reference;
pub mod resolve;
pub mod schema;
pub mod services;
pub mod transform;
pub mod validation;

mod harmonise;

pub use crate::harmonise::{ALL_COUNTRIES, BatchReport, Harmoniser, expand_countries};
pub use config::{CategoryConfig, OutputOptions};
pub use countries::ExtensionRegistry;
pub use error::{FacilityError, Result};
pub use facility::{CountryOverride, Extension, Facility, HarmonisationReport, PipelineOptions};
pub use input::{DataTable, LoadOptions, SourceMetadata};
pub use metadata::{CodeName, MetadataRecord, OutputIndex};
pub use output::OutputFormat;
pub use resolve::{LocationOutcome, LocationStrategy};
pub use schema::{FacilityCategory, FieldType, SchemaField, SchemaRegistry};
pub use services::Services;
pub use validation::{Check, Observation, Severity, ValidationEngine};
