//! Offline collaborator implementations for testing and air-gapped runs.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;

use indexmap::IndexMap;

use crate::error::{FacilityError, Result};

use super::provider::{Coordinate, GeocodedPlace, Geocoder, TextService};

/// Geocoder that answers every request with the same place.
pub struct StaticGeocoder {
    answer: Option<GeocodedPlace>,
    queries: Mutex<Vec<String>>,
}

impl StaticGeocoder {
    /// Answer every request with the given coordinates and no quality code.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            answer: Some(GeocodedPlace {
                coordinate: Coordinate::new(lat, lon),
                quality: None,
            }),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Never find anything.
    pub fn unmatched() -> Self {
        Self {
            answer: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Report a provider quality code with every answer.
    pub fn with_quality(mut self, quality: i32) -> Self {
        if let Some(answer) = self.answer.as_mut() {
            answer.quality = Some(quality);
        }
        self
    }

    /// Number of `locate` calls made so far.
    pub fn calls(&self) -> usize {
        self.queries().len()
    }

    /// Place strings received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Geocoder for StaticGeocoder {
    fn locate(&self, place: &str) -> Result<Option<GeocodedPlace>> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(place.to_string());
        Ok(self.answer)
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Dictionary-based translation and language detection.
///
/// Each glossary entry names one concept in several languages. Translation
/// replaces a known term by its counterpart and leaves unknown text
/// unchanged; detection picks the language whose terms match most words.
#[derive(Debug, Clone, Default)]
pub struct GlossaryTextService {
    entries: Vec<IndexMap<String, String>>,
}

impl GlossaryTextService {
    /// Create an empty glossary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Glossary of address component names, enough to compose place strings.
    pub fn place_terms() -> Self {
        let rows: [[(&str, &str); 6]; 5] = [
            [("en", "street"), ("de", "strasse"), ("fr", "rue"), ("it", "via"), ("cs", "ulice"), ("lt", "gatve")],
            [("en", "number"), ("de", "hausnummer"), ("fr", "numero"), ("it", "civico"), ("cs", "cislo"), ("lt", "numeris")],
            [("en", "postcode"), ("de", "plz"), ("fr", "code postal"), ("it", "cap"), ("cs", "psc"), ("lt", "pasto kodas")],
            [("en", "city"), ("de", "ort"), ("fr", "ville"), ("it", "comune"), ("cs", "obec"), ("lt", "miestas")],
            [("en", "country"), ("de", "land"), ("fr", "pays"), ("it", "paese"), ("cs", "zeme"), ("lt", "salis")],
        ];
        rows.into_iter().fold(Self::new(), |glossary, row| glossary.with_entry(row))
    }

    /// Load entries from a JSON array of `{lang: term}` objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FacilityError::io(path, e))?;
        let entries: Vec<IndexMap<String, String>> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self { entries })
    }

    /// Add one concept.
    pub fn with_entry<I, L, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.entries.push(
            terms
                .into_iter()
                .map(|(lang, term)| (lang.into().to_lowercase(), term.into()))
                .collect(),
        );
        self
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the glossary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn translate_one(&self, text: &str, from: &str, to: &str) -> String {
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .get(from)
                    .is_some_and(|term| term.eq_ignore_ascii_case(text.trim()))
            })
            .and_then(|entry| entry.get(to))
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }
}

impl TextService for GlossaryTextService {
    fn detect_language(&self, text: &str) -> Result<String> {
        let mut scores: IndexMap<&str, usize> = IndexMap::new();
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            for entry in &self.entries {
                for (lang, term) in entry {
                    if term.eq_ignore_ascii_case(word) {
                        *scores.entry(lang.as_str()).or_default() += 1;
                    }
                }
            }
        }

        scores
            .into_iter()
            .max_by_key(|(_, score)| *score)
            .map(|(lang, _)| lang.to_string())
            .ok_or_else(|| FacilityError::Service(format!("language of '{}' not detected", text)))
    }

    fn translate(&self, texts: &[String], from: &str, to: &str) -> Result<Vec<String>> {
        let (from, to) = (from.to_lowercase(), to.to_lowercase());
        Ok(texts
            .iter()
            .map(|text| self.translate_one(text, &from, &to))
            .collect())
    }

    fn name(&self) -> &str {
        "glossary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_geocoder_counts_calls() {
        let geocoder = StaticGeocoder::new(48.85, 2.35).with_quality(2);
        let place = geocoder.locate("Rue de Rivoli, Paris").unwrap().unwrap();
        assert_eq!(place.coordinate, Coordinate::new(48.85, 2.35));
        assert_eq!(place.quality, Some(2));
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(geocoder.queries(), vec!["Rue de Rivoli, Paris"]);
        assert!(StaticGeocoder::unmatched().locate("x").unwrap().is_none());
    }

    #[test]
    fn test_glossary_translate() {
        let glossary = GlossaryTextService::new()
            .with_entry([("en", "Name"), ("cs", "Nazev")])
            .with_entry([("en", "City"), ("cs", "Obec")]);
        let out = glossary
            .translate(&["Nazev".into(), "Unknown".into()], "cs", "en")
            .unwrap();
        assert_eq!(out, vec!["Name", "Unknown"]);
    }

    #[test]
    fn test_glossary_detect() {
        let glossary = GlossaryTextService::place_terms();
        assert_eq!(glossary.detect_language("strasse hausnummer").unwrap(), "de");
        assert!(glossary.detect_language("zzz").is_err());
    }
}
