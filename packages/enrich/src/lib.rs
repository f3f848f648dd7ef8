#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Listing-table enrichment for property valuation.
//!
//! Two passes over a CSV table of listings:
//!
//! 1. [`geocode::geocode_table`] turns address/city columns into `lat`/`lon`
//!    via a [`Geocoder`](geo_valuation_geocoder::Geocoder), backed by a
//!    persistent [`GeocodeCache`](geo_valuation_geocoder::cache::GeocodeCache).
//! 2. [`amenities::enrich_table`] adds, per amenity category, the distance
//!    to the nearest matching amenity and its name, using an
//!    [`AmenitySource`](geo_valuation_amenity::AmenitySource).
//!
//! Both passes run strictly sequentially and pace their external calls
//! through a [`throttle::Throttle`]. Per-row failures are logged and leave
//! empty cells; only setup problems surface as [`EnrichError`].

pub mod amenities;
pub mod geocode;
pub mod progress;
pub mod service_registry;
pub mod table;
pub mod throttle;

use geo_valuation_amenity::AmenityError;
use geo_valuation_geocoder::GeocodeError;
use geo_valuation_geocoder::cache::CacheError;
use thiserror::Error;

/// Errors that abort a pass.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Filesystem error reading or writing a table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input or a failed CSV write.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column the pass requires is absent from the input table.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// An input row has more fields than the header.
    #[error("Row at line {line} has {fields} fields but the header has {columns} columns")]
    RaggedRow {
        /// 1-based line number in the input file.
        line: u64,
        /// Fields found on that row.
        fields: usize,
        /// Columns in the header.
        columns: usize,
    },

    /// The geocode cache could not be persisted.
    #[error("Geocode cache error: {0}")]
    Cache(#[from] CacheError),

    /// Invalid amenity configuration (e.g. an unparseable category).
    #[error("Amenity error: {0}")]
    Amenity(#[from] AmenityError),

    /// The geocoder could not be constructed.
    #[error("Geocoder error: {0}")]
    Geocode(#[from] GeocodeError),
}
