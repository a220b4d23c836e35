//! OpenStreetMap Nominatim geocoder.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::error::{FacilityError, Result};

use super::provider::{Coordinate, GeocodedPlace, Geocoder};

/// Default Nominatim search endpoint.
const DEFAULT_API_URL: &str = "https://nominatim.openstreetmap.org/search";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Geocoder backed by a Nominatim search API.
pub struct NominatimGeocoder {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    country: Option<String>,
}

impl NominatimGeocoder {
    /// Create a geocoder against the public endpoint.
    ///
    /// `NOMINATIM_URL` overrides the endpoint.
    pub fn new() -> Result<Self> {
        let api_url = std::env::var("NOMINATIM_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::with_endpoint(api_url, DEFAULT_TIMEOUT)
    }

    /// Create a geocoder against a custom endpoint.
    pub fn with_endpoint(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FacilityError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: None,
            country: None,
        })
    }

    /// Set an API key (sent as the `key` parameter, as hosted instances expect).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Restrict results to one country code.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into().to_lowercase());
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("eufacility/", env!("CARGO_PKG_VERSION"))),
        );
        headers
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    #[serde(default)]
    importance: Option<f64>,
}

impl SearchResult {
    fn quality(&self) -> Option<i32> {
        // Nominatim importance is in [0, 1]; bucket it into the geo-quality codes
        self.importance.map(|i| match i {
            i if i >= 0.6 => 1,
            i if i >= 0.3 => 2,
            _ => 3,
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn locate(&self, place: &str) -> Result<Option<GeocodedPlace>> {
        let mut query: Vec<(&str, &str)> = vec![("q", place), ("format", "json"), ("limit", "1")];
        if let Some(country) = &self.country {
            query.push(("countrycodes", country.as_str()));
        }
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let response = self
            .client
            .get(&self.api_url)
            .headers(self.build_headers())
            .query(&query)
            .send()
            .map_err(|e| FacilityError::Service(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(FacilityError::Service(format!(
                "Nominatim error ({}): {}",
                status, error_text
            )));
        }

        let results: Vec<SearchResult> = response.json().map_err(|e| {
            FacilityError::Service(format!("Failed to parse Nominatim response: {}", e))
        })?;

        let Some(best) = results.first() else {
            debug!(place, "no geocoding match");
            return Ok(None);
        };

        let lat = best.lat.parse::<f64>();
        let lon = best.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(Some(GeocodedPlace {
                coordinate: Coordinate::new(lat, lon),
                quality: best.quality(),
            })),
            _ => Err(FacilityError::Service(format!(
                "Nominatim returned unparsable coordinates '{} {}'",
                best.lat, best.lon
            ))),
        }
    }

    fn name(&self) -> &str {
        "nominatim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_buckets() {
        let result = |importance| SearchResult {
            lat: "0".into(),
            lon: "0".into(),
            importance,
        };
        assert_eq!(result(Some(0.8)).quality(), Some(1));
        assert_eq!(result(Some(0.4)).quality(), Some(2));
        assert_eq!(result(Some(0.1)).quality(), Some(3));
        assert_eq!(result(None).quality(), None);
    }

    #[test]
    fn test_response_shape() {
        let json = r#"[{"lat": "48.2082", "lon": "16.3738", "importance": 0.7, "display_name": "Wien"}]"#;
        let results: Vec<SearchResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results[0].lat, "48.2082");
    }
}
