//! Per-country and batch harmonisation drivers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::CategoryConfig;
use crate::countries::ExtensionRegistry;
use crate::error::{FacilityError, Result};
use crate::facility::{Extension, Facility, HarmonisationReport};
use crate::metadata::{CodeName, MetadataRecord};
use crate::output::OutputFormat;
use crate::reference::{self, COUNTRIES};
use crate::schema::FacilityCategory;
use crate::services::Services;

/// Keyword expanding to every known country.
pub const ALL_COUNTRIES: &str = "ALL";

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub category: FacilityCategory,
    pub succeeded: Vec<HarmonisationReport>,
    /// Country code to error message.
    pub failed: IndexMap<String, String>,
}

impl BatchReport {
    /// Whether every country succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of countries processed.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the pipeline for countries of one category.
///
/// Each run gets a fresh [`Facility`] with its own metadata copy; only the
/// category configuration is shared.
pub struct Harmoniser {
    config: Arc<CategoryConfig>,
    metadata_dir: PathBuf,
    services: Services,
    extensions: ExtensionRegistry,
    formats: Vec<OutputFormat>,
    dump_metadata: bool,
}

impl Harmoniser {
    /// Create a driver with the built-in country overrides.
    pub fn new(config: CategoryConfig) -> Self {
        Self {
            config: Arc::new(config),
            metadata_dir: PathBuf::from("metadata"),
            services: Services::none(),
            extensions: ExtensionRegistry::builtin(),
            formats: Vec::new(),
            dump_metadata: false,
        }
    }

    /// Directory holding `<cat>/<CC><cat>.json` sidecars.
    pub fn with_metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metadata_dir = dir.into();
        self
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// Formats to write, overriding the sidecar options when not empty.
    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Always dump the final metadata.
    pub fn with_metadata_dump(mut self, dump: bool) -> Self {
        self.dump_metadata = dump;
        self
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    /// Sidecar location of a country.
    pub fn metadata_path(&self, country: &str) -> PathBuf {
        let code = self.config.category.code();
        self.metadata_dir
            .join(code)
            .join(format!("{}{}.json", reference::normalize_country(country), code))
    }

    /// Metadata of a country and the directory its relative paths refer to.
    ///
    /// The sidecar wins over the default metadata of a country override.
    pub fn load_metadata(
        &self,
        country: &str,
        extension: &Extension,
    ) -> Result<(MetadataRecord, Option<PathBuf>)> {
        let path = self.metadata_path(country);
        let (mut meta, base) = if path.is_file() {
            let base = path.parent().map(Path::to_path_buf);
            (MetadataRecord::load(&path)?, base)
        } else if let Some(default) = extension.metadata() {
            (default.clone(), None)
        } else {
            return Err(FacilityError::Metadata(format!(
                "no metadata for {} at {}",
                country,
                path.display()
            )));
        };

        if meta.country().is_none() {
            let code = reference::normalize_country(country);
            let name = reference::country_name(&code).unwrap_or_default();
            meta.set_country(Some(CodeName::new(code, name)));
        }
        Ok((meta, base))
    }

    /// Build the pipeline instance of a country.
    pub fn facility(&self, country: &str) -> Result<Facility> {
        let extension = self.extensions.probe(self.config.category, country);
        let (meta, base) = self.load_metadata(country, &extension)?;

        let mut facility = Facility::new(Arc::clone(&self.config), &meta)?
            .with_services(self.services.clone())
            .with_extension(extension);
        if let Some(base) = base {
            facility = facility.with_base_dir(base);
        }
        if !self.formats.is_empty() {
            facility.options_mut().save.formats = self.formats.clone();
        }
        if self.dump_metadata {
            facility.options_mut().save.dump_metadata = true;
        }
        Ok(facility)
    }

    /// Harmonise one country.
    pub fn harmonise(&self, country: &str) -> Result<HarmonisationReport> {
        self.facility(country)?.run()
    }

    /// Harmonise several countries, never stopping on a failure.
    pub fn harmonise_countries<S: AsRef<str>>(&self, countries: &[S]) -> BatchReport {
        let mut report = BatchReport {
            category: self.config.category,
            succeeded: Vec::new(),
            failed: IndexMap::new(),
        };

        for country in expand_countries(countries) {
            match self.harmonise(&country) {
                Ok(run) => {
                    info!(country = %country, rows = run.rows, "harmonised");
                    report.succeeded.push(run);
                }
                Err(e) => {
                    if matches!(e, FacilityError::Metadata(_)) {
                        warn!(country = %country, error = %e, "skipped");
                    } else {
                        error!(country = %country, error = %e, "harmonisation failed");
                    }
                    report.failed.insert(country, e.to_string());
                }
            }
        }
        report
    }
}

/// Normalise country codes, expanding [`ALL_COUNTRIES`].
pub fn expand_countries<S: AsRef<str>>(countries: &[S]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for country in countries {
        let country = country.as_ref().trim();
        let expanded: Vec<String> = if country.eq_ignore_ascii_case(ALL_COUNTRIES) {
            COUNTRIES.keys().map(|c| c.to_string()).collect()
        } else {
            vec![reference::normalize_country(country)]
        };
        for code in expanded {
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_countries() {
        assert_eq!(expand_countries(&["at", "GR", "AT"]), vec!["AT", "EL"]);
        assert_eq!(expand_countries(&["all"]).len(), COUNTRIES.len());
    }

    #[test]
    fn test_metadata_path() {
        let harmoniser = Harmoniser::new(CategoryConfig::default_for(FacilityCategory::Healthcare))
            .with_metadata_dir("meta");
        assert_eq!(
            harmoniser.metadata_path("cz"),
            PathBuf::from("meta/hcs/CZhcs.json")
        );
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let harmoniser = Harmoniser::new(CategoryConfig::default_for(FacilityCategory::Healthcare))
            .with_metadata_dir(dir.path());

        let report = harmoniser.harmonise_countries(&["FR", "DE"]);
        assert_eq!(report.len(), 2);
        assert!(!report.is_success());
        assert!(report.failed.contains_key("DE"));
    }
}
