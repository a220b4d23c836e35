//! Country override hooks.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Result;
use crate::input::DataTable;
use crate::metadata::{MetadataRecord, OutputIndex};

use super::engine::{Facility, HarmonisationReport};

/// Country-specific cleanup run before generic column resolution.
///
/// The hook may add columns and register them in the output index.
pub type PrepareFn =
    Arc<dyn Fn(&mut DataTable, &mut OutputIndex, &IndexMap<String, Value>) -> Result<()> + Send + Sync>;

/// Full replacement of the load-to-save part of the pipeline.
pub type HarmoniseFn = Arc<dyn Fn(&mut Facility) -> Result<HarmonisationReport> + Send + Sync>;

/// Hooks a country may provide. Every hook is optional.
#[derive(Clone, Default)]
pub struct CountryOverride {
    /// Country code the override applies to.
    pub code: String,
    /// Metadata used when no sidecar exists for the country.
    pub metadata: Option<MetadataRecord>,
    pub prepare: Option<PrepareFn>,
    pub harmonise: Option<HarmoniseFn>,
}

impl CountryOverride {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into().to_uppercase(),
            ..Self::default()
        }
    }

    /// Provide default metadata.
    pub fn with_metadata(mut self, metadata: MetadataRecord) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Provide a prepare hook.
    pub fn with_prepare<F>(mut self, prepare: F) -> Self
    where
        F: Fn(&mut DataTable, &mut OutputIndex, &IndexMap<String, Value>) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.prepare = Some(Arc::new(prepare));
        self
    }

    /// Replace the generic pipeline entirely.
    pub fn with_harmonise<F>(mut self, harmonise: F) -> Self
    where
        F: Fn(&mut Facility) -> Result<HarmonisationReport> + Send + Sync + 'static,
    {
        self.harmonise = Some(Arc::new(harmonise));
        self
    }
}

impl fmt::Debug for CountryOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountryOverride")
            .field("code", &self.code)
            .field("metadata", &self.metadata.is_some())
            .field("prepare", &self.prepare.is_some())
            .field("harmonise", &self.harmonise.is_some())
            .finish()
    }
}

/// Behaviour of a pipeline instance.
#[derive(Debug, Clone, Default)]
pub enum Extension {
    /// Generic pipeline only.
    #[default]
    Default,
    /// Generic pipeline with country hooks.
    CountryOverride(CountryOverride),
}

impl Extension {
    pub fn prepare(&self) -> Option<&PrepareFn> {
        match self {
            Extension::CountryOverride(o) => o.prepare.as_ref(),
            Extension::Default => None,
        }
    }

    pub fn harmonise(&self) -> Option<&HarmoniseFn> {
        match self {
            Extension::CountryOverride(o) => o.harmonise.as_ref(),
            Extension::Default => None,
        }
    }

    pub fn metadata(&self) -> Option<&MetadataRecord> {
        match self {
            Extension::CountryOverride(o) => o.metadata.as_ref(),
            Extension::Default => None,
        }
    }
}
