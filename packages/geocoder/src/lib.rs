#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for listing addresses.
//!
//! Converts free-text listing addresses to latitude/longitude using the
//! public Nominatim / `OpenStreetMap` search API, which allows at most one
//! request per second. Results (including "no match" answers) are kept in a
//! file-backed [`cache::GeocodeCache`] so that re-running the pipeline does
//! not query the same address twice.
//!
//! The [`Geocoder`] trait is the seam between the geocoding pass and the
//! network; tests substitute their own implementation.

pub mod cache;
pub mod nominatim;
pub mod query;

use async_trait::async_trait;
use geo_valuation_models::Point;
use thiserror::Error;

/// A geocoding result with coordinates and the geocoder's canonical name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Resolved coordinate (WGS84).
    pub point: Point,
    /// The matched/canonical place name returned by the geocoder.
    pub display_name: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Resolves a free-text query to a single best-match location.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes `query`.
    ///
    /// Returns `Ok(None)` when the service answered but found no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response parsing fails.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}
