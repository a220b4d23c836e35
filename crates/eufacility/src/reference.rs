//! Country and language reference tables.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// ISO 3166-1 alpha-2 codes of the covered countries with their English names.
///
/// Greece is listed under `EL` as in Eurostat usage; `GR` is accepted as an alias
/// by [`country_name`].
pub static COUNTRIES: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AT", "Austria"),
        ("BE", "Belgium"),
        ("BG", "Bulgaria"),
        ("CH", "Switzerland"),
        ("CY", "Cyprus"),
        ("CZ", "Czechia"),
        ("DE", "Germany"),
        ("DK", "Denmark"),
        ("EE", "Estonia"),
        ("EL", "Greece"),
        ("ES", "Spain"),
        ("FI", "Finland"),
        ("FR", "France"),
        ("HR", "Croatia"),
        ("HU", "Hungary"),
        ("IE", "Ireland"),
        ("IS", "Iceland"),
        ("IT", "Italy"),
        ("LI", "Liechtenstein"),
        ("LT", "Lithuania"),
        ("LU", "Luxembourg"),
        ("LV", "Latvia"),
        ("MT", "Malta"),
        ("NL", "Netherlands"),
        ("NO", "Norway"),
        ("PL", "Poland"),
        ("PT", "Portugal"),
        ("RO", "Romania"),
        ("SE", "Sweden"),
        ("SI", "Slovenia"),
        ("SK", "Slovakia"),
        ("UK", "United Kingdom"),
    ]
    .into_iter()
    .collect()
});

/// ISO 639-1 language codes recognised by the column resolver.
pub static LANGUAGES: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("bg", "bulgarian"),
        ("ca", "catalan"),
        ("cs", "czech"),
        ("da", "danish"),
        ("de", "german"),
        ("el", "greek"),
        ("en", "english"),
        ("es", "spanish"),
        ("et", "estonian"),
        ("eu", "basque"),
        ("fi", "finnish"),
        ("fr", "french"),
        ("ga", "irish"),
        ("gl", "galician"),
        ("hr", "croatian"),
        ("hu", "hungarian"),
        ("is", "icelandic"),
        ("it", "italian"),
        ("lb", "luxembourgish"),
        ("lt", "lithuanian"),
        ("lv", "latvian"),
        ("mt", "maltese"),
        ("nl", "dutch"),
        ("no", "norwegian"),
        ("pl", "polish"),
        ("pt", "portuguese"),
        ("ro", "romanian"),
        ("ru", "russian"),
        ("sk", "slovak"),
        ("sl", "slovenian"),
        ("sv", "swedish"),
        ("tr", "turkish"),
    ]
    .into_iter()
    .collect()
});

/// Normalise a country code (`gr` -> `EL`, `gb` -> `UK`).
pub fn normalize_country(code: &str) -> String {
    match code.trim().to_uppercase().as_str() {
        "GR" => "EL".to_string(),
        "GB" => "UK".to_string(),
        other => other.to_string(),
    }
}

/// English name of a country code.
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRIES.get(normalize_country(code).as_str()).copied()
}

/// Whether a language code is recognised.
pub fn is_language(code: &str) -> bool {
    LANGUAGES.contains_key(code.trim().to_lowercase().as_str())
}

/// Name of a language code.
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES.get(code.trim().to_lowercase().as_str()).copied()
}
