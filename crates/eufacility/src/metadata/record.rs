//! Per-dataset metadata record.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::facility::PipelineOptions;
use crate::reference;
use crate::schema::FacilityCategory;

/// Keys recognised in a metadata sidecar.
pub const METADATA_KEYS: &[&str] = &[
    "provider", "country", "lang", "proj", "file", "path", "enc", "sep", "date", "columns",
    "index", "options", "category",
];

/// One source column under its per-language names (`lang -> alias`).
pub type AliasRecord = IndexMap<String, String>;

/// Canonical key to source column, `None` when the field is not available.
pub type OutputIndex = IndexMap<String, Option<String>>;

/// A `{code, name}` pair, also accepted as a bare code string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeName {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl CodeName {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl<'de> Deserialize<'de> for CodeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(String),
            Full {
                code: String,
                #[serde(default)]
                name: Option<String>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Code(code) => CodeName::new(code, ""),
            Repr::Full { code, name } => CodeName::new(code, name.unwrap_or_default()),
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Descriptors of one raw source dataset, persisted as a JSON sidecar.
///
/// Fields are private; the serialized names follow the sidecar convention
/// (`lang`, `enc`, `sep`, `date`, `columns`, `index`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    country: Option<CodeName>,
    #[serde(rename = "lang", default, skip_serializing_if = "Option::is_none")]
    language: Option<CodeName>,
    #[serde(rename = "proj", default, skip_serializing_if = "Option::is_none")]
    projection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(rename = "enc", default, skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
    #[serde(rename = "sep", default, skip_serializing_if = "Option::is_none")]
    separator: Option<String>,
    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
    date_pattern: Option<String>,
    #[serde(
        rename = "columns",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    input_columns: Vec<AliasRecord>,
    #[serde(
        rename = "index",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    output_index: OutputIndex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<PipelineOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<CodeName>,
}

impl MetadataRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skeleton sidecar for a country, to be filled in by hand.
    pub fn template(category: FacilityCategory, country: Option<&str>) -> Self {
        let upper = country
            .map(reference::normalize_country)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "CC".to_string());
        let lower = upper.to_lowercase();

        let alias = |local: &str, en: &str, fr: &str, de: &str| -> AliasRecord {
            [
                (lower.clone(), local.to_string()),
                ("en".to_string(), en.to_string()),
                ("fr".to_string(), fr.to_string()),
                ("de".to_string(), de.to_string()),
            ]
            .into_iter()
            .collect()
        };

        let mut options = PipelineOptions::default();
        options.load.encoding = Some("latin1".to_string());
        options.load.separator = Some(";".to_string());
        options.load.date_format = Some("%d-%m-%Y".to_string());

        Self {
            country: Some(CodeName::new(
                upper.clone(),
                reference::country_name(&upper).unwrap_or_default(),
            )),
            language: Some(CodeName::new(
                lower.clone(),
                reference::language_name(&lower).unwrap_or_default(),
            )),
            file: Some(format!("{}.csv", upper)),
            path: Some("../../data/raw/".to_string()),
            encoding: Some("latin1".to_string()),
            separator: Some(";".to_string()),
            date_pattern: Some("%d-%m-%Y".to_string()),
            input_columns: vec![
                alias("icol1", "icol1", "icol1", "iSpal1"),
                alias("icol2", "icol2", "icol2", "iSpal2"),
            ],
            output_index: [
                ("ocol1".to_string(), Some("icol1".to_string())),
                ("ocol2".to_string(), Some("icol2".to_string())),
            ]
            .into_iter()
            .collect(),
            options: Some(options),
            category: Some(CodeName::new(category.code(), category.label())),
            ..Self::default()
        }
    }

    /// Whether no recognised key is set.
    pub fn is_empty(&self) -> bool {
        self.provider.is_none()
            && self.country.is_none()
            && self.language.is_none()
            && self.projection.is_none()
            && self.file.is_none()
            && self.path.is_none()
            && self.encoding.is_none()
            && self.separator.is_none()
            && self.date_pattern.is_none()
            && self.input_columns.is_empty()
            && self.output_index.is_empty()
            && self.options.is_none()
            && self.category.is_none()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn set_provider(&mut self, provider: Option<String>) {
        self.provider = provider;
    }

    pub fn country(&self) -> Option<&CodeName> {
        self.country.as_ref()
    }

    /// Country code, upper-cased.
    pub fn country_code(&self) -> Option<String> {
        self.country
            .as_ref()
            .map(|c| reference::normalize_country(&c.code))
    }

    pub fn set_country(&mut self, country: Option<CodeName>) {
        self.country = country;
    }

    pub fn language(&self) -> Option<&CodeName> {
        self.language.as_ref()
    }

    /// Language code, lower-cased.
    pub fn language_code(&self) -> Option<String> {
        self.language.as_ref().map(|l| l.code.to_lowercase())
    }

    pub fn set_language(&mut self, language: Option<CodeName>) {
        self.language = language;
    }

    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    pub fn set_projection(&mut self, projection: Option<String>) {
        self.projection = projection;
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn set_file(&mut self, file: Option<String>) {
        self.file = file;
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<String>) {
        self.path = path;
    }

    /// Declared encoding, falling back to the `load` options.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding
            .as_deref()
            .or_else(|| self.options.as_ref()?.load.encoding.as_deref())
    }

    pub fn set_encoding(&mut self, encoding: Option<String>) {
        self.encoding = encoding;
    }

    /// Declared separator, falling back to the `load` options.
    pub fn separator(&self) -> Option<&str> {
        self.separator
            .as_deref()
            .or_else(|| self.options.as_ref()?.load.separator.as_deref())
    }

    pub fn set_separator(&mut self, separator: Option<String>) {
        self.separator = separator;
    }

    /// Input date pattern, falling back to the `load` options.
    pub fn date_pattern(&self) -> Option<&str> {
        self.date_pattern
            .as_deref()
            .or_else(|| self.options.as_ref()?.load.date_format.as_deref())
    }

    pub fn set_date_pattern(&mut self, pattern: Option<String>) {
        self.date_pattern = pattern;
    }

    pub fn input_columns(&self) -> &[AliasRecord] {
        &self.input_columns
    }

    pub fn set_input_columns(&mut self, columns: Vec<AliasRecord>) {
        self.input_columns = columns;
    }

    pub fn output_index(&self) -> &OutputIndex {
        &self.output_index
    }

    pub fn set_output_index(&mut self, index: OutputIndex) {
        self.output_index = index;
    }

    pub fn options(&self) -> Option<&PipelineOptions> {
        self.options.as_ref()
    }

    pub fn set_options(&mut self, options: Option<PipelineOptions>) {
        self.options = options;
    }

    pub fn category(&self) -> Option<&CodeName> {
        self.category.as_ref()
    }

    pub fn set_category(&mut self, category: Option<CodeName>) {
        self.category = category;
    }

    /// Source location assembled from `path` and `file`.
    ///
    /// A `file` that is itself absolute or a URL is used as is.
    pub fn source(&self) -> Option<String> {
        let file = self.file.as_deref().filter(|f| !f.is_empty());
        let path = self.path.as_deref().filter(|p| !p.is_empty());
        match (path, file) {
            (_, Some(f)) if is_url(f) || f.starts_with('/') => Some(f.to_string()),
            (Some(p), Some(f)) if is_url(p) => {
                Some(format!("{}/{}", p.trim_end_matches('/'), f))
            }
            (Some(p), Some(f)) => Some(
                std::path::Path::new(p)
                    .join(f)
                    .to_string_lossy()
                    .into_owned(),
            ),
            (None, Some(f)) => Some(f.to_string()),
            (Some(p), None) => Some(p.to_string()),
            (None, None) => None,
        }
    }
}

/// Whether a location is a remote URL.
pub fn is_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("ftp://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_name_accepts_string_or_object() {
        let record: MetadataRecord = serde_json::from_str(
            r#"{"country": "cz", "lang": {"code": "cs", "name": null}}"#,
        )
        .unwrap();
        assert_eq!(record.country_code().as_deref(), Some("CZ"));
        assert_eq!(record.language_code().as_deref(), Some("cs"));
        assert_eq!(record.language().unwrap().name, "");
    }

    #[test]
    fn test_template_shape() {
        let record = MetadataRecord::template(FacilityCategory::Healthcare, Some("at"));
        assert_eq!(record.country().unwrap().name, "Austria");
        assert_eq!(record.language_code().as_deref(), Some("at"));
        assert_eq!(record.file(), Some("AT.csv"));
        assert_eq!(record.encoding(), Some("latin1"));
        assert_eq!(record.input_columns().len(), 2);
        assert_eq!(
            record.output_index().get("ocol1"),
            Some(&Some("icol1".to_string()))
        );
        assert_eq!(record.category().unwrap().code, "hcs");
    }

    #[test]
    fn test_options_fallbacks() {
        let record: MetadataRecord =
            serde_json::from_str(r#"{"options": {"load": {"enc": "latin1", "sep": ";"}}}"#)
                .unwrap();
        assert_eq!(record.encoding(), Some("latin1"));
        assert_eq!(record.separator(), Some(";"));
        assert!(!record.is_empty());
    }

    #[test]
    fn test_source_assembly() {
        let mut record = MetadataRecord::new();
        assert_eq!(record.source(), None);
        record.set_path(Some("data/raw".into()));
        record.set_file(Some("AT.csv".into()));
        assert_eq!(record.source().as_deref(), Some("data/raw/AT.csv"));
        record.set_path(Some("https://example.org/open/".into()));
        assert_eq!(
            record.source().as_deref(),
            Some("https://example.org/open/AT.csv")
        );
    }
}
