//! The harmonisation pipeline of one (category, country) dataset.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::CategoryConfig;
use crate::error::{FacilityError, Result};
use crate::input::{DataTable, Parser, SourceFormat, SourceMetadata};
use crate::metadata::{AliasRecord, CodeName, MetadataRecord, OutputIndex, is_url};
use crate::output::{OutputFormat, OutputFormatter, OutputGenerator, OutputLayout};
use crate::reference;
use crate::resolve::{ColumnResolver, LocationInput, LocationOutcome, LocationResolver};
use crate::schema::{FacilityCategory, LOCATION_KEYS};
use crate::services::Services;
use crate::transform::{CastOutcome, Caster, DEFAULT_INPUT_DATE};

use super::hooks::Extension;
use super::options::PipelineOptions;

/// Summary of one harmonisation run.
#[derive(Debug, Clone, Serialize)]
pub struct HarmonisationReport {
    pub category: FacilityCategory,
    pub country: String,
    /// Descriptor and fingerprint of the loaded source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,
    pub rows: usize,
    /// Harmonised columns, in output order.
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationOutcome>,
    /// Casts that degraded to text.
    pub cast_fallbacks: Vec<CastOutcome>,
    /// Data files written.
    pub written: Vec<PathBuf>,
    /// Metadata dump, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PathBuf>,
    /// Failures that were tolerated.
    pub warnings: Vec<String>,
}

/// One pipeline instance, bound to a category configuration, a private copy
/// of the dataset metadata and the dataset itself.
///
/// Setters mirror their value into the metadata record while metadata sync is
/// on (the default), so that a final dump reflects what the run discovered.
pub struct Facility {
    config: Arc<CategoryConfig>,
    meta: MetadataRecord,
    sync_metadata: bool,
    options: PipelineOptions,
    services: Services,
    extension: Extension,
    base_dir: Option<PathBuf>,

    country: String,
    language: String,
    projection: Option<String>,
    source: Option<String>,
    encoding: Option<String>,
    separator: Option<String>,
    date_pattern: Option<String>,
    input_columns: Vec<AliasRecord>,
    output_index: OutputIndex,

    fetched: Option<(String, Vec<u8>)>,
    data: Option<DataTable>,
    source_metadata: Option<SourceMetadata>,
    location_sources: (Option<String>, Option<String>),
    location: Option<LocationOutcome>,
    casts: Vec<CastOutcome>,
    written: Vec<PathBuf>,
    metadata_file: Option<PathBuf>,
    warnings: Vec<String>,
}

fn not_loaded() -> FacilityError {
    FacilityError::SourceNotFound("no dataset loaded".to_string())
}

impl Facility {
    /// Create a pipeline instance. The metadata is copied, never shared.
    pub fn new(config: Arc<CategoryConfig>, meta: &MetadataRecord) -> Result<Self> {
        let meta = meta.clone();
        let country = meta
            .country_code()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FacilityError::Metadata("metadata declares no country".to_string()))?;
        let language = meta
            .language_code()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| country.to_lowercase());

        Ok(Self {
            options: meta.options().cloned().unwrap_or_default(),
            projection: meta.projection().map(str::to_string),
            source: meta.source(),
            encoding: meta.encoding().map(str::to_string),
            separator: meta.separator().map(str::to_string),
            date_pattern: meta.date_pattern().map(str::to_string),
            input_columns: meta.input_columns().to_vec(),
            output_index: meta.output_index().clone(),
            config,
            meta,
            sync_metadata: true,
            services: Services::none(),
            extension: Extension::Default,
            base_dir: None,
            country,
            language,
            fetched: None,
            data: None,
            source_metadata: None,
            location_sources: (None, None),
            location: None,
            casts: Vec::new(),
            written: Vec::new(),
            metadata_file: None,
            warnings: Vec::new(),
        })
    }

    /// Attach collaborator services.
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Attach country hooks.
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }

    /// Directory relative source paths are resolved against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Replace the pipeline options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable mirroring of setters into the metadata record.
    pub fn with_metadata_sync(mut self, sync: bool) -> Self {
        self.sync_metadata = sync;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    pub fn metadata(&self) -> &MetadataRecord {
        &self.meta
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut PipelineOptions {
        &mut self.options
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    pub fn date_pattern(&self) -> Option<&str> {
        self.date_pattern.as_deref()
    }

    pub fn input_columns(&self) -> &[AliasRecord] {
        &self.input_columns
    }

    pub fn output_index(&self) -> &OutputIndex {
        &self.output_index
    }

    /// The dataset, once loaded.
    pub fn data(&self) -> Option<&DataTable> {
        self.data.as_ref()
    }

    /// Mutable access to the dataset, for country overrides.
    pub fn data_mut(&mut self) -> Option<&mut DataTable> {
        self.data.as_mut()
    }

    // ------------------------------------------------------------------
    // Setters, mirrored into the metadata record
    // ------------------------------------------------------------------

    pub fn set_country(&mut self, code: &str) {
        let code = reference::normalize_country(code);
        if self.sync_metadata {
            let name = reference::country_name(&code).unwrap_or_default();
            self.meta.set_country(Some(CodeName::new(code.clone(), name)));
        }
        self.country = code;
    }

    pub fn set_language(&mut self, code: &str) {
        let code = code.trim().to_lowercase();
        if self.sync_metadata {
            let name = reference::language_name(&code).unwrap_or_default();
            self.meta.set_language(Some(CodeName::new(code.clone(), name)));
        }
        self.language = code;
    }

    pub fn set_projection(&mut self, projection: Option<String>) {
        if self.sync_metadata {
            self.meta.set_projection(projection.clone());
        }
        self.projection = projection;
    }

    pub fn set_source(&mut self, source: Option<String>) {
        if self.sync_metadata {
            self.meta.set_file(source.clone());
            self.meta.set_path(None);
        }
        self.source = source;
    }

    pub fn set_encoding(&mut self, encoding: Option<String>) {
        if self.sync_metadata {
            self.meta.set_encoding(encoding.clone());
        }
        self.encoding = encoding;
    }

    pub fn set_separator(&mut self, separator: Option<String>) {
        if self.sync_metadata {
            self.meta.set_separator(separator.clone());
        }
        self.separator = separator;
    }

    pub fn set_date_pattern(&mut self, pattern: Option<String>) {
        if self.sync_metadata {
            self.meta.set_date_pattern(pattern.clone());
        }
        self.date_pattern = pattern;
    }

    pub fn set_input_columns(&mut self, columns: Vec<AliasRecord>) {
        if self.sync_metadata {
            self.meta.set_input_columns(columns.clone());
        }
        self.input_columns = columns;
    }

    pub fn set_output_index(&mut self, index: OutputIndex) {
        if self.sync_metadata {
            self.meta.set_output_index(index.clone());
        }
        self.output_index = index;
    }

    // ------------------------------------------------------------------
    // Pipeline steps
    // ------------------------------------------------------------------

    /// Download a remote source. Returns whether anything was fetched.
    pub fn fetch(&mut self) -> Result<bool> {
        let url = self
            .options
            .fetch
            .url
            .clone()
            .or_else(|| self.source.clone().filter(|s| is_url(s)));
        let Some(url) = url else {
            return Ok(false);
        };
        let Some(fetcher) = self.services.fetcher.clone() else {
            warn!(url = %url, "no fetch service configured, remote source skipped");
            return Ok(false);
        };

        if !fetcher.is_available(&url)? {
            return Err(FacilityError::SourceNotFound(url));
        }
        let bytes = fetcher.fetch(&url)?;
        info!(url = %url, bytes = bytes.len(), "fetched remote source");

        if let Some(dest) = self.options.fetch.save_to.clone() {
            write_bytes(&dest, &bytes)?;
            self.set_source(Some(dest.to_string_lossy().into_owned()));
        }
        let name = url.rsplit('/').next().unwrap_or(url.as_str()).to_string();
        self.fetched = Some((name, bytes));
        Ok(true)
    }

    /// Load the raw source.
    ///
    /// Seeds the alias records from the header when none were declared, and
    /// records the separator and encoding that worked when none were declared.
    pub fn load(&mut self) -> Result<()> {
        let mut load = self.options.load.clone();
        load.encoding = self.encoding.clone().or(load.encoding);
        load.separator = self.separator.clone().or(load.separator);
        let parser = Parser::with_options(load);

        let loaded = match self.fetched.take() {
            Some((name, bytes)) => parser.load_bytes(&bytes, &name)?,
            None => {
                let source = self
                    .source
                    .clone()
                    .ok_or_else(|| FacilityError::SourceNotFound("no source declared".to_string()))?;
                if is_url(&source) {
                    return Err(FacilityError::SourceNotFound(format!(
                        "{} (remote source not fetched)",
                        source
                    )));
                }
                parser.load_path(self.resolve_path(&source))?
            }
        };
        info!(
            rows = loaded.table.row_count(),
            columns = loaded.table.column_count(),
            format = ?loaded.metadata.format,
            "source loaded"
        );

        if self.separator.is_none() {
            if let Some(sep) = loaded.metadata.separator {
                self.set_separator(Some(sep.to_string()));
            }
        }
        if self.encoding.is_none() && loaded.metadata.format != SourceFormat::Spreadsheet {
            self.set_encoding(Some(loaded.metadata.encoding.clone()));
        }
        if self.input_columns.is_empty() {
            let aliases = ColumnResolver::new(&self.language)
                .seed_aliases(loaded.table.headers.iter().map(String::as_str));
            self.set_input_columns(aliases);
        }

        self.source_metadata = Some(loaded.metadata);
        self.data = Some(loaded.table);
        Ok(())
    }

    /// Run the country prepare hook, if any.
    pub fn prepare(&mut self) -> Result<()> {
        let Some(hook) = self.extension.prepare().cloned() else {
            return Ok(());
        };
        let table = self.data.as_mut().ok_or_else(not_loaded)?;
        let mut index = self.output_index.clone();
        hook(table, &mut index, &self.options.prepare)?;
        debug!(keys = index.len(), "prepare hook done");
        self.set_output_index(index);
        Ok(())
    }

    /// Resolve every declared or requested canonical key to a dataset column.
    ///
    /// Unresolvable keys are kept in the index as `None`. Keys outside the
    /// schema are dropped. The alias records gain any translation made.
    pub fn resolve_columns(&mut self) -> Result<IndexMap<String, String>> {
        let config = Arc::clone(&self.config);
        let registry = &config.registry;
        let table = self.data.as_ref().ok_or_else(not_loaded)?;

        let mut keys: Vec<String> = self.output_index.keys().cloned().collect();
        for key in &self.options.format.keys {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }

        let declared: Vec<&str> = keys
            .iter()
            .filter_map(|k| self.output_index.get(k).and_then(|v| v.as_deref()))
            .collect();
        let resolver = ColumnResolver::new(&self.language)
            .with_text_service(self.services.text.as_deref());
        let mut aliases = self.input_columns.clone();
        let translated = match resolver.resolve(&mut aliases, &declared, None, &self.language) {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(error = %e, "column resolution failed, matching names directly");
                self.warnings.push(e.to_string());
                IndexMap::new()
            }
        };

        let mut mapping = IndexMap::new();
        let mut index = OutputIndex::new();
        for key in &keys {
            if !registry.contains(key) {
                debug!(key = %key, "not a canonical key, ignored");
                continue;
            }
            let declared = self.output_index.get(key).cloned().flatten();
            let source = declared
                .as_deref()
                .and_then(|name| {
                    translated
                        .get(name)
                        .filter(|c| table.has_column(c))
                        .cloned()
                        .or_else(|| table.has_column(name).then(|| name.to_string()))
                })
                .or_else(|| {
                    if !self.options.format.force {
                        return None;
                    }
                    [key.as_str(), registry.output_name(key).unwrap_or(key)]
                        .into_iter()
                        .find(|c| table.has_column(c))
                        .map(str::to_string)
                });

            match &source {
                Some(column) => {
                    mapping.insert(key.clone(), column.clone());
                }
                None => debug!(key = %key, "no source column"),
            }
            index.insert(key.clone(), source);
        }

        info!(resolved = mapping.len(), keys = index.len(), "columns resolved");
        self.set_input_columns(aliases);
        self.set_output_index(index);
        Ok(mapping)
    }

    /// Rename resolved columns to their output names and cast them, then
    /// materialise the constant columns (`cc`, `country`, `refdate`).
    ///
    /// Coordinate keys are left to [`Facility::resolve_location`].
    pub fn apply_columns(&mut self, mapping: &IndexMap<String, String>) -> Result<()> {
        let config = Arc::clone(&self.config);
        let registry = &config.registry;
        let input_date = self
            .date_pattern
            .as_deref()
            .or(self.options.load.date_format.as_deref())
            .unwrap_or(DEFAULT_INPUT_DATE);
        let caster = Caster::new()
            .with_input_date(input_date)
            .with_output_date(&config.options.date_format);
        let mut index = self.output_index.clone();

        self.location_sources = (mapping.get("lat").cloned(), mapping.get("lon").cloned());

        let table = self.data.as_mut().ok_or_else(not_loaded)?;
        let mut moved: IndexMap<String, String> = IndexMap::new();
        for (key, source) in mapping {
            if LOCATION_KEYS.contains(&key.as_str()) {
                continue;
            }
            let Some(field) = registry.get(key) else {
                continue;
            };
            let output = field.output_name.as_str();

            // A source shared by several keys was already renamed once
            let present = match moved.get(source) {
                Some(previous) => table.copy_column(previous, output),
                None => table.rename_column(source, output),
            };
            if !present {
                warn!(key = %key, column = %source, "source column vanished");
                index.insert(key.clone(), None);
                continue;
            }
            moved.insert(source.clone(), output.to_string());

            let field_caster = match field.date_pattern() {
                Some(pattern) => caster.clone().with_output_date(pattern),
                None => caster.clone(),
            };
            let cast = field_caster.cast_column(table, output, field.field_type)?;
            if cast.fell_back() {
                warn!(
                    column = output,
                    target = %cast.target,
                    failures = cast.failures,
                    "cast failed, column kept as text"
                );
                self.casts.push(cast);
            }
            index.insert(key.clone(), Some(output.to_string()));
        }

        let country_name = reference::country_name(&self.country).unwrap_or_default();
        let constants = [
            ("cc", Some(self.country.clone())),
            ("country", Some(country_name.to_string())),
            ("refdate", self.options.format.reference_date.clone()),
        ];
        for (key, value) in constants {
            let (Some(value), Some(field)) = (value, registry.get(key)) else {
                continue;
            };
            if mapping.contains_key(key) || table.has_column(&field.output_name) {
                continue;
            }
            table.fill_column(&field.output_name, &value, field.field_type);
            index.insert(key.to_string(), Some(field.output_name.clone()));
        }

        self.set_output_index(index);
        Ok(())
    }

    /// Column resolution, renaming and casting.
    pub fn format(&mut self) -> Result<()> {
        let mapping = self.resolve_columns()?;
        self.apply_columns(&mapping)
    }

    /// Establish the coordinate columns.
    pub fn resolve_location(&mut self) -> Result<LocationOutcome> {
        let config = Arc::clone(&self.config);
        let table = self.data.as_mut().ok_or_else(not_loaded)?;
        let (lat, lon) = &self.location_sources;
        let input = LocationInput {
            lat: lat.as_deref(),
            lon: lon.as_deref(),
            index: &self.output_index,
            input_projection: self.projection.as_deref(),
            output_projection: config.options.projection.as_deref(),
        };

        let outcome = LocationResolver::new(&config.registry, &self.language)
            .with_geocoder(self.services.geocoder.as_deref())
            .with_projector(self.services.projector.as_deref())
            .with_text_service(self.services.text.as_deref())
            .resolve(table, input, &self.options.locate)?;

        let located: Vec<(String, String)> = LOCATION_KEYS
            .iter()
            .filter_map(|key| {
                let output = config.registry.output_name(key)?;
                table
                    .has_column(output)
                    .then(|| (key.to_string(), output.to_string()))
            })
            .collect();

        let mut index = self.output_index.clone();
        for (key, output) in located {
            index.insert(key, Some(output));
        }
        self.set_output_index(index);
        self.casts
            .extend(outcome.casts.iter().filter(|c| c.fell_back()).cloned());
        self.location = Some(outcome.clone());
        Ok(outcome)
    }

    /// Drop every non-canonical column and finalise the output index.
    ///
    /// With `force_keep`, declared canonical columns that are absent are added
    /// empty with their declared type.
    pub fn prune(&mut self) -> Result<()> {
        let config = Arc::clone(&self.config);
        let force_keep = self.options.format.force_keep;
        let table = self.data.as_mut().ok_or_else(not_loaded)?;

        let mut index = OutputIndex::new();
        for field in config.registry.fields() {
            let declared = self.output_index.get(&field.key);
            let requested = self.options.format.keys.contains(&field.key);
            let mapped = matches!(declared, Some(Some(_)));

            if mapped && table.has_column(&field.output_name) {
                index.insert(field.key.clone(), Some(field.output_name.clone()));
            } else if declared.is_some() || requested {
                if force_keep {
                    table.fill_column(&field.output_name, "", field.field_type);
                    index.insert(field.key.clone(), Some(field.output_name.clone()));
                } else {
                    index.insert(field.key.clone(), None);
                }
            }
        }

        let keep: Vec<&str> = index.values().flatten().map(String::as_str).collect();
        table.retain_columns(&keep);
        debug!(columns = table.column_count(), "pruned");

        self.set_output_index(index);
        Ok(())
    }

    /// Serialize the dataset in one format.
    pub fn serialize(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let table = self.data.as_ref().ok_or_else(not_loaded)?;
        let layout = OutputLayout::new(&self.config.registry, table)
            .with_separator(&self.config.options.separator)?
            .with_encoding(&self.config.options.encoding)?;
        OutputFormatter::for_format(format)?.format(table, &layout)
    }

    /// Write every requested format to the output directory.
    ///
    /// Every format is serialized before the first file is written, so a
    /// failing format leaves no partial output behind.
    pub fn save(&mut self) -> Result<Vec<PathBuf>> {
        let outputs = self
            .options
            .save
            .formats()
            .into_iter()
            .map(|format| Ok((format, self.serialize(format)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut written = Vec::new();
        for (format, bytes) in outputs {
            let path = self.config.output_file(&self.country, format);
            write_bytes(&path, &bytes)?;
            info!(path = %path.display(), "written");
            written.push(path);
        }
        self.written.extend(written.iter().cloned());
        Ok(written)
    }

    /// Persist the metadata record of this run.
    pub fn dump_metadata(&mut self) -> Result<PathBuf> {
        if self.sync_metadata {
            self.meta.set_options(Some(self.options.clone()));
        }
        let path = self.config.metadata_file(&self.country);
        self.meta.save(&path)?;
        info!(path = %path.display(), "metadata saved");
        self.metadata_file = Some(path.clone());
        Ok(path)
    }

    /// Run the whole pipeline.
    ///
    /// Fetch, load and save failures abort the run. Prepare, column and
    /// location failures are logged and the run continues with what it has,
    /// except for a missing projection transformer.
    pub fn run(&mut self) -> Result<HarmonisationReport> {
        let span = info_span!(
            "harmonise",
            category = %self.config.category,
            country = %self.country
        );
        let _enter = span.enter();

        if let Some(harmonise) = self.extension.harmonise().cloned() {
            info!("country override replaces the generic pipeline");
            return harmonise(self);
        }

        self.fetch()?;
        self.load()?;

        let prepared = self.prepare();
        self.tolerate("prepare", prepared);

        let mapping = self.resolve_columns();
        if let Some(mapping) = self.tolerate("resolve_columns", mapping) {
            let applied = self.apply_columns(&mapping);
            self.tolerate("apply_columns", applied);
        }

        match self.resolve_location() {
            Ok(_) => {}
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "location not resolved, continuing without coordinates");
                self.warnings.push(format!("resolve_location: {}", e));
            }
            Err(e) => return Err(e),
        }

        let pruned = self.prune();
        self.tolerate("prune", pruned);

        self.save()?;
        if self.options.save.dump_metadata {
            self.dump_metadata()?;
        }

        info!(rows = self.data.as_ref().map_or(0, DataTable::row_count), "OK");
        Ok(self.report())
    }

    /// Report of what the run did so far.
    pub fn report(&self) -> HarmonisationReport {
        let (rows, columns) = match &self.data {
            Some(table) => {
                let order = table.ordered_indices(self.config.registry.output_names());
                (
                    table.row_count(),
                    order.into_iter().map(|i| table.headers[i].clone()).collect(),
                )
            }
            None => (0, Vec::new()),
        };
        HarmonisationReport {
            category: self.config.category,
            country: self.country.clone(),
            source: self.source_metadata.clone(),
            rows,
            columns,
            location: self.location.clone(),
            cast_fallbacks: self.casts.clone(),
            written: self.written.clone(),
            metadata: self.metadata_file.clone(),
            warnings: self.warnings.clone(),
        }
    }

    fn tolerate<T>(&mut self, step: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(step, error = %e, "step failed, continuing");
                self.warnings.push(format!("{}: {}", step, e));
                None
            }
        }
    }

    fn resolve_path(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FacilityError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| FacilityError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CodeName;
    use tempfile::TempDir;

    fn metadata(file: &str) -> MetadataRecord {
        let mut meta = MetadataRecord::new();
        meta.set_country(Some(CodeName::new("FR", "France")));
        meta.set_language(Some(CodeName::new("en", "English")));
        meta.set_file(Some(file.to_string()));
        meta.set_output_index(
            [
                ("name".to_string(), Some("Name".to_string())),
                ("lat".to_string(), Some("Lat".to_string())),
                ("lon".to_string(), Some("Lon".to_string())),
                ("ocol1".to_string(), Some("icol1".to_string())),
            ]
            .into_iter()
            .collect(),
        );
        meta
    }

    fn facility(dir: &TempDir, csv: &str) -> Facility {
        fs::write(dir.path().join("FR.csv"), csv).unwrap();
        let config = CategoryConfig::default_for(FacilityCategory::Healthcare)
            .with_path(dir.path().join("out"));
        Facility::new(Arc::new(config), &metadata("FR.csv"))
            .unwrap()
            .with_base_dir(dir.path())
    }

    #[test]
    fn test_requires_country() {
        let config = Arc::new(CategoryConfig::default_for(FacilityCategory::Healthcare));
        let err = Facility::new(config, &MetadataRecord::new()).err().unwrap();
        assert!(matches!(err, FacilityError::Metadata(_)));
    }

    #[test]
    fn test_load_records_detected_separator() {
        let dir = TempDir::new().unwrap();
        let mut facility = facility(&dir, "Name;Lat;Lon\nA;48.85;2.35\n");
        facility.load().unwrap();

        assert_eq!(facility.separator(), Some(";"));
        assert_eq!(facility.metadata().separator(), Some(";"));
        assert_eq!(facility.input_columns().len(), 3);
    }

    #[test]
    fn test_setters_respect_sync() {
        let dir = TempDir::new().unwrap();
        let mut facility = facility(&dir, "Name\nA\n").with_metadata_sync(false);
        facility.set_projection(Some("EPSG:3857".to_string()));
        assert_eq!(facility.projection(), Some("EPSG:3857"));
        assert_eq!(facility.metadata().projection(), None);
    }

    #[test]
    fn test_resolve_drops_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let mut facility = facility(&dir, "Name,Lat,Lon\nA,48.85,2.35\n");
        facility.load().unwrap();
        let mapping = facility.resolve_columns().unwrap();

        assert_eq!(mapping.get("name").map(String::as_str), Some("Name"));
        assert!(!facility.output_index().contains_key("ocol1"));
    }

    #[test]
    fn test_constant_columns() {
        let dir = TempDir::new().unwrap();
        let mut facility = facility(&dir, "Name,Lat,Lon\nA,48.85,2.35\n");
        facility.options_mut().format.reference_date = Some("01/01/2024".to_string());
        facility.load().unwrap();
        facility.format().unwrap();

        let table = facility.data().unwrap();
        assert_eq!(table.column_by_name("cc").unwrap(), vec!["FR"]);
        assert_eq!(table.column_by_name("country").unwrap(), vec!["France"]);
        assert_eq!(table.column_by_name("ref_date").unwrap(), vec!["01/01/2024"]);
    }

    #[test]
    fn test_force_keep_materialises_declared_columns() {
        let dir = TempDir::new().unwrap();
        let mut facility = facility(&dir, "Name,Lat,Lon\nA,48.85,2.35\n");
        facility.options_mut().format.keys = vec!["beds".to_string()];
        facility.options_mut().format.force_keep = true;
        facility.load().unwrap();
        facility.format().unwrap();
        facility.resolve_location().unwrap();
        facility.prune().unwrap();

        let table = facility.data().unwrap();
        assert_eq!(table.column_by_name("cap_beds").unwrap(), vec![""]);
        assert_eq!(
            facility.output_index().get("beds"),
            Some(&Some("cap_beds".to_string()))
        );
    }
}
