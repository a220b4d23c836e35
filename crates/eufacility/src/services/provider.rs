//! Collaborator service traits.
//!
//! The pipeline never depends on a concrete translator, geocoder, projection
//! library or HTTP client. Each is reached through one of these traits and
//! may be absent; callers decide how to degrade.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A WGS 84 (or projected) coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Answer of a geocoding request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub coordinate: Coordinate,
    /// Provider-reported geo-quality code, when the provider has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<i32>,
}

/// Language detection and translation.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait TextService: Send + Sync {
    /// Detect the language of a text, returning an ISO 639-1 code.
    fn detect_language(&self, text: &str) -> Result<String>;

    /// Translate a batch of texts. The output has the same length as the input.
    fn translate(&self, texts: &[String], from: &str, to: &str) -> Result<Vec<String>>;

    /// Get the service name.
    fn name(&self) -> &str;
}

/// Forward geocoding of place strings.
pub trait Geocoder: Send + Sync {
    /// Locate a place. `Ok(None)` means the provider has no match.
    fn locate(&self, place: &str) -> Result<Option<GeocodedPlace>>;

    /// Get the geocoder name.
    fn name(&self) -> &str;
}

/// Coordinate reprojection between reference systems.
pub trait Projector: Send + Sync {
    /// Transform a coordinate from one CRS to another.
    fn reproject(&self, coordinate: Coordinate, from: &str, to: &str) -> Result<Coordinate>;

    /// Whether the transformation between two systems is supported.
    fn supports(&self, from: &str, to: &str) -> bool;
}

/// Retrieval of remote sources.
pub trait RemoteFetch: Send + Sync {
    /// Check that a remote resource answers.
    fn is_available(&self, url: &str) -> Result<bool>;

    /// Download a remote resource.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// The set of collaborators available to a pipeline run.
#[derive(Clone, Default)]
pub struct Services {
    pub text: Option<Arc<dyn TextService>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub projector: Option<Arc<dyn Projector>>,
    pub fetcher: Option<Arc<dyn RemoteFetch>>,
}

impl Services {
    /// No collaborators at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the text service.
    pub fn with_text(mut self, text: impl TextService + 'static) -> Self {
        self.text = Some(Arc::new(text));
        self
    }

    /// Set the geocoder.
    pub fn with_geocoder(mut self, geocoder: impl Geocoder + 'static) -> Self {
        self.geocoder = Some(Arc::new(geocoder));
        self
    }

    /// Set the projector.
    pub fn with_projector(mut self, projector: impl Projector + 'static) -> Self {
        self.projector = Some(Arc::new(projector));
        self
    }

    /// Set the remote fetcher.
    pub fn with_fetcher(mut self, fetcher: impl RemoteFetch + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("text", &self.text.as_ref().map(|t| t.name().to_string()))
            .field("geocoder", &self.geocoder.as_ref().map(|g| g.name().to_string()))
            .field("projector", &self.projector.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}
