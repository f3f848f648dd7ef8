#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearby point-of-interest lookups for listing enrichment.
//!
//! An [`AmenityCategory`] names what to look for (schools, hospitals,
//! metro stations, or any `key=value` `OpenStreetMap` tag). An
//! [`AmenitySource`] answers "which of those are within `radius` meters of
//! this point"; [`overpass::OverpassClient`] is the network-backed
//! implementation.

pub mod category;
pub mod overpass;

pub use category::AmenityCategory;

use async_trait::async_trait;
use geo_valuation_models::{AmenityCandidate, Point};

/// Errors from amenity queries.
#[derive(Debug, thiserror::Error)]
pub enum AmenityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The service answered HTTP 429.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// A category string could not be turned into a query.
    #[error("Invalid amenity category '{0}'")]
    InvalidCategory(String),
}

/// Source of amenity candidates around a point.
#[async_trait]
pub trait AmenitySource: Send + Sync {
    /// Returns every candidate of `category` within `radius_m` meters of
    /// `origin`. An empty list means nothing was found.
    ///
    /// # Errors
    ///
    /// Returns [`AmenityError`] if the lookup itself failed.
    async fn candidates(
        &self,
        origin: Point,
        category: &AmenityCategory,
        radius_m: u32,
    ) -> Result<Vec<AmenityCandidate>, AmenityError>;
}
