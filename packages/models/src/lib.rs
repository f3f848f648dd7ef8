#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core data types shared across the geo valuation pipeline.
//!
//! These types describe listing locations, cached geocoding results, and
//! the per-category amenity distances attached to each listing. They carry
//! no I/O and are safe to share between the geocoding pass and the
//! enrichment driver.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
///
/// Construction does not validate ranges; use [`Point::is_valid`] (or
/// [`Point::try_new`]) where out-of-range input must be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Point {
    /// Creates a point without range checks.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Creates a point only if both coordinates are finite and in range.
    #[must_use]
    pub fn try_new(latitude: f64, longitude: f64) -> Option<Self> {
        let point = Self::new(latitude, longitude);
        point.is_valid().then_some(point)
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Free-text geocoding query (address plus locality). Used verbatim as the
/// cache key.
pub type GeoQuery = String;

/// A geocoding result as persisted in the geocode cache.
///
/// `point` is `None` when the geocoder found no match. That miss is cached
/// too, so the same query is not sent again on later runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The exact query string that was geocoded.
    pub query: GeoQuery,
    /// Resolved coordinate, if any.
    pub point: Option<Point>,
    /// Canonical place name returned by the geocoder.
    pub display_name: Option<String>,
}

impl CacheEntry {
    /// Entry for a successful lookup.
    #[must_use]
    pub fn hit(query: impl Into<GeoQuery>, point: Point, display_name: Option<String>) -> Self {
        Self {
            query: query.into(),
            point: Some(point),
            display_name,
        }
    }

    /// Entry for a lookup the geocoder answered with "no match".
    #[must_use]
    pub fn miss(query: impl Into<GeoQuery>) -> Self {
        Self {
            query: query.into(),
            point: None,
            display_name: None,
        }
    }
}

/// A point of interest returned by an amenity query.
#[derive(Debug, Clone, PartialEq)]
pub struct AmenityCandidate {
    /// Value of the `name` tag, if the element had one.
    pub name: Option<String>,
    /// Node coordinate, or the center of a way/relation.
    pub point: Point,
}

impl AmenityCandidate {
    #[must_use]
    pub const fn new(name: Option<String>, point: Point) -> Self {
        Self { name, point }
    }
}

/// Nearest amenity for one (row, category) pair.
///
/// Both fields are `None` when nothing was found within the search radius
/// or the lookup failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceResult {
    /// Distance to the nearest candidate, in meters. Never negative.
    pub distance_m: Option<f64>,
    /// Name of the nearest candidate.
    pub nearest_name: Option<String>,
}

impl DistanceResult {
    /// The "no result" value.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            distance_m: None,
            nearest_name: None,
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.distance_m.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_range_checks() {
        assert!(Point::try_new(12.9716, 77.5946).is_some());
        assert!(Point::try_new(90.0, 180.0).is_some());
        assert!(Point::try_new(-90.1, 0.0).is_none());
        assert!(Point::try_new(0.0, 180.5).is_none());
        assert!(Point::try_new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn cache_entry_miss_has_no_point() {
        let entry = CacheEntry::miss("Nowhere, Atlantis");
        assert!(entry.point.is_none());
        assert!(entry.display_name.is_none());
        assert_eq!(entry.query, "Nowhere, Atlantis");
    }

    #[test]
    fn default_distance_result_is_none() {
        assert!(DistanceResult::default().is_none());
        assert_eq!(DistanceResult::default(), DistanceResult::none());
    }

    #[test]
    fn point_serializes_with_full_field_names() {
        let json = serde_json::to_value(Point::new(1.5, -2.5)).unwrap();
        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["longitude"], -2.5);
    }
}
