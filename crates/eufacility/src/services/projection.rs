//! Spherical Web Mercator reprojection.

use crate::error::{FacilityError, Result};

use super::provider::{Coordinate, Projector};

const EARTH_RADIUS: f64 = 6_378_137.0;

/// Transforms between WGS 84 (EPSG:4326) and Web Mercator (EPSG:3857).
///
/// Projected coordinates are carried as `lon = x` and `lat = y`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorProjector;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Crs {
    Wgs84,
    WebMercator,
}

fn parse_crs(name: &str) -> Option<Crs> {
    let normalized = name.trim().to_uppercase().replace([' ', '_', '-'], "");
    match normalized.as_str() {
        "WGS84" | "EPSG:4326" | "4326" => Some(Crs::Wgs84),
        "EPSG:3857" | "3857" | "WEBMERCATOR" | "EPSG:900913" => Some(Crs::WebMercator),
        _ => None,
    }
}

impl WebMercatorProjector {
    pub fn new() -> Self {
        Self
    }
}

impl Projector for WebMercatorProjector {
    fn reproject(&self, coordinate: Coordinate, from: &str, to: &str) -> Result<Coordinate> {
        let (Some(source), Some(target)) = (parse_crs(from), parse_crs(to)) else {
            return Err(FacilityError::ProjectionUnavailable(format!(
                "no transformer from '{}' to '{}'",
                from, to
            )));
        };

        Ok(match (source, target) {
            (Crs::Wgs84, Crs::WebMercator) => {
                let x = EARTH_RADIUS * coordinate.lon.to_radians();
                let y = EARTH_RADIUS
                    * (std::f64::consts::FRAC_PI_4 + coordinate.lat.to_radians() / 2.0)
                        .tan()
                        .ln();
                Coordinate::new(y, x)
            }
            (Crs::WebMercator, Crs::Wgs84) => {
                let lon = (coordinate.lon / EARTH_RADIUS).to_degrees();
                let lat = (2.0 * (coordinate.lat / EARTH_RADIUS).exp().atan()
                    - std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                Coordinate::new(lat, lon)
            }
            _ => coordinate,
        })
    }

    fn supports(&self, from: &str, to: &str) -> bool {
        parse_crs(from).is_some() && parse_crs(to).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_vienna() {
        let projector = WebMercatorProjector::new();
        let vienna = Coordinate::new(48.2082, 16.3738);
        let projected = projector.reproject(vienna, "WGS84", "EPSG:3857").unwrap();
        assert!((projected.lon - 1_822_723.0).abs() < 1.0);

        let back = projector.reproject(projected, "EPSG:3857", "EPSG:4326").unwrap();
        assert!((back.lat - vienna.lat).abs() < 1e-9);
        assert!((back.lon - vienna.lon).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_crs() {
        let projector = WebMercatorProjector::new();
        assert!(!projector.supports("EPSG:3035", "WGS84"));
        let err = projector
            .reproject(Coordinate::new(0.0, 0.0), "EPSG:3035", "WGS84")
            .unwrap_err();
        assert!(matches!(err, FacilityError::ProjectionUnavailable(_)));
    }
}
