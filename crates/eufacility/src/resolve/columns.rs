//! Resolution of column names across languages.
//!
//! Every source column is described by an alias record (`lang -> name`).
//! Names requested in one language are looked up among the aliases of that
//! language and answered with the alias in the output language. Aliases
//! missing for a language are translated on demand and cached back into the
//! records, so later resolutions need no translation.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{FacilityError, Result};
use crate::metadata::AliasRecord;
use crate::reference;
use crate::services::TextService;

/// Resolves requested column names through per-language alias records.
pub struct ColumnResolver<'a> {
    dataset_lang: String,
    text: Option<&'a dyn TextService>,
}

impl<'a> ColumnResolver<'a> {
    /// Create a resolver for a dataset declared in `dataset_lang`.
    pub fn new(dataset_lang: impl Into<String>) -> Self {
        Self {
            dataset_lang: dataset_lang.into().to_lowercase(),
            text: None,
        }
    }

    /// Attach a text service used for detection and translation.
    pub fn with_text_service(mut self, text: Option<&'a dyn TextService>) -> Self {
        self.text = text;
        self
    }

    /// Seed alias records from a raw header, all under the dataset language.
    pub fn seed_aliases<'h>(&self, headers: impl IntoIterator<Item = &'h str>) -> Vec<AliasRecord> {
        headers
            .into_iter()
            .map(|h| {
                let mut record = AliasRecord::new();
                record.insert(self.dataset_lang.clone(), h.to_string());
                record
            })
            .collect()
    }

    /// Resolve requested names from `input_lang` into `output_lang`.
    ///
    /// Returns a mapping `requested name -> resolved name` holding only the
    /// names that were found. With no requested names, every known column is
    /// returned, keyed by its dataset-language alias.
    pub fn resolve(
        &self,
        aliases: &mut [AliasRecord],
        requested: &[&str],
        input_lang: Option<&str>,
        output_lang: &str,
    ) -> Result<IndexMap<String, String>> {
        let ilang = match input_lang {
            Some(lang) => lang.to_lowercase(),
            None if !requested.is_empty() => self.detect(requested),
            None => self.dataset_lang.clone(),
        };
        let olang = output_lang.to_lowercase();

        for lang in [&ilang, &olang] {
            if !reference::is_language(lang) {
                return Err(FacilityError::ColumnResolution(format!(
                    "language not recognised: '{}'",
                    lang
                )));
            }
        }

        self.ensure_language(aliases, &ilang);
        if olang != ilang {
            self.ensure_language(aliases, &olang);
        }

        if requested.is_empty() {
            return Ok(aliases
                .iter()
                .filter_map(|record| {
                    let source = self.source_name(record)?;
                    let resolved = record
                        .get(&olang)
                        .or_else(|| record.get(&ilang))
                        .unwrap_or(source);
                    Some((source.clone(), resolved.clone()))
                })
                .collect());
        }

        let reverse: IndexMap<&str, &AliasRecord> = aliases
            .iter()
            .filter_map(|record| record.get(&ilang).map(|alias| (alias.as_str(), record)))
            .collect();

        let mut mapping = IndexMap::new();
        for name in requested {
            let Some(record) = reverse.get(name) else {
                debug!(column = name, lang = %ilang, "no alias record");
                continue;
            };
            if let Some(resolved) = record.get(&olang).or_else(|| record.get(&ilang)) {
                mapping.insert(name.to_string(), resolved.clone());
            }
        }
        Ok(mapping)
    }

    /// Best-effort detection of the language of the requested names.
    fn detect(&self, requested: &[&str]) -> String {
        let Some(text) = self.text else {
            return self.dataset_lang.clone();
        };
        match text.detect_language(&requested.join(" ")) {
            Ok(lang) if reference::is_language(&lang) => lang.to_lowercase(),
            Ok(lang) => {
                debug!(detected = %lang, "detected language not recognised");
                self.dataset_lang.clone()
            }
            Err(e) => {
                debug!(error = %e, "language detection failed");
                self.dataset_lang.clone()
            }
        }
    }

    /// Translate and cache aliases missing for `lang`.
    fn ensure_language(&self, aliases: &mut [AliasRecord], lang: &str) {
        if lang == self.dataset_lang {
            return;
        }
        let missing: Vec<usize> = aliases
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.contains_key(lang))
            .map(|(i, _)| i)
            .collect();
        if missing.is_empty() {
            return;
        }
        let Some(text) = self.text else {
            debug!(lang, "no text service, aliases left untranslated");
            return;
        };

        let sources: Vec<(usize, String)> = missing
            .into_iter()
            .filter_map(|i| self.source_name(&aliases[i]).map(|s| (i, s.clone())))
            .collect();
        let texts: Vec<String> = sources.iter().map(|(_, s)| s.clone()).collect();

        match text.translate(&texts, &self.dataset_lang, lang) {
            Ok(translated) if translated.len() == texts.len() => {
                for ((i, _), alias) in sources.into_iter().zip(translated) {
                    aliases[i].insert(lang.to_string(), alias);
                }
            }
            Ok(_) => warn!(lang, "translation returned a different number of names"),
            Err(e) => warn!(lang, error = %e, "translation failed, aliases left untranslated"),
        }
    }

    fn source_name<'r>(&self, record: &'r AliasRecord) -> Option<&'r String> {
        record
            .get(&self.dataset_lang)
            .or_else(|| record.values().next())
    }
}
