//! Collaborator services: translation, geocoding, projection and remote fetch.

mod fetch;
mod mock;
mod nominatim;
mod projection;
mod provider;

pub use fetch::HttpFetcher;
pub use mock::{GlossaryTextService, StaticGeocoder};
pub use nominatim::NominatimGeocoder;
pub use projection::WebMercatorProjector;
pub use provider::{
    Coordinate, GeocodedPlace, Geocoder, Projector, RemoteFetch, Services, TextService,
};
