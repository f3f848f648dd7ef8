//! Geocoding pass: listing addresses → `lat`/`lon` columns.
//!
//! For each row the address and (optional) city cells are joined into a
//! query. The geocode cache is consulted first; only cache misses reach the
//! geocoder, and every answer (match or no match) is recorded back to the
//! cache immediately. Geocoder errors are logged and not cached, so the
//! next run retries them. A failing cache write aborts the pass: silently
//! losing cache updates would re-query the same addresses on every run.

use std::sync::Arc;

use geo_valuation_geocoder::cache::GeocodeCache;
use geo_valuation_geocoder::query::build_query;
use geo_valuation_geocoder::{GeocodeError, Geocoder};
use geo_valuation_models::{CacheEntry, Point};

use crate::EnrichError;
use crate::progress::ProgressCallback;
use crate::table::Table;
use crate::throttle::{Pacing, Throttle};

/// Column holding the query string sent to the geocoder.
pub const QUERY_COLUMN: &str = "geo_query";
/// Latitude output column.
pub const LAT_COLUMN: &str = "lat";
/// Longitude output column.
pub const LON_COLUMN: &str = "lon";

/// Options for [`geocode_table`].
#[derive(Debug, Clone)]
pub struct GeocodeOptions {
    /// Column holding the street address or locality. Required.
    pub address_column: String,
    /// Column holding the city. Used when present in the table.
    pub city_column: Option<String>,
    /// Pause after each geocoder call; `error_backoff` applies after an
    /// HTTP 429 answer.
    pub pacing: Pacing,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            address_column: "address".to_string(),
            city_column: Some("city".to_string()),
            pacing: Pacing::from_millis(1100, 60_000),
        }
    }
}

/// Counts from one geocoding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeocodeReport {
    /// Rows in the table.
    pub rows: usize,
    /// Rows with nothing to geocode.
    pub skipped: usize,
    /// Rows answered from the cache (hit or cached miss).
    pub cache_hits: usize,
    /// Rows resolved by a geocoder call.
    pub resolved: usize,
    /// Rows the geocoder answered with "no match".
    pub not_found: usize,
    /// Rows whose geocoder call failed.
    pub failed: usize,
}

/// Fills `geo_query`, `lat`, and `lon` for every row of `table`.
///
/// # Errors
///
/// Returns [`EnrichError::MissingColumn`] if the address column is absent
/// (before any row is processed) or [`EnrichError::Cache`] if a cache write
/// fails.
pub async fn geocode_table(
    table: &mut Table,
    geocoder: &dyn Geocoder,
    cache: &mut GeocodeCache,
    throttle: &dyn Throttle,
    options: &GeocodeOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<GeocodeReport, EnrichError> {
    let addr_col = table.require_column(&options.address_column)?;
    let city_col = options.city_column.as_deref().and_then(|name| {
        let col = table.column(name);
        if col.is_none() {
            log::warn!("City column '{name}' not found, geocoding with address only");
        }
        col
    });

    let query_col = table.reset_column(QUERY_COLUMN);
    let lat_col = table.reset_column(LAT_COLUMN);
    let lon_col = table.reset_column(LON_COLUMN);

    let mut report = GeocodeReport {
        rows: table.len(),
        ..GeocodeReport::default()
    };
    progress.set_total(table.len() as u64);
    progress.set_message("Geocoding".to_string());

    for row in 0..table.len() {
        let query = build_query([
            table.get(row, addr_col),
            city_col.and_then(|c| table.get(row, c)),
        ]);

        let Some(query) = query else {
            report.skipped += 1;
            progress.inc(1);
            continue;
        };
        table.set(row, query_col, Some(query.clone()));

        if let Some(entry) = cache.lookup(&query) {
            log::debug!("Cache hit for '{query}'");
            set_point(table, row, lat_col, lon_col, entry.point);
            report.cache_hits += 1;
            progress.inc(1);
            continue;
        }

        match geocoder.geocode(&query).await {
            Ok(Some(found)) => {
                set_point(table, row, lat_col, lon_col, Some(found.point));
                cache.record(CacheEntry::hit(
                    query.as_str(),
                    found.point,
                    found.display_name,
                ))?;
                report.resolved += 1;
            }
            Ok(None) => {
                log::debug!("No geocoding match for '{query}'");
                cache.record(CacheEntry::miss(query.as_str()))?;
                report.not_found += 1;
            }
            Err(e) => {
                log::warn!("Geocode error for '{query}': {e}");
                report.failed += 1;
                if matches!(e, GeocodeError::RateLimited) {
                    log::warn!(
                        "Rate limited by geocoder, waiting {:?}...",
                        options.pacing.error_backoff
                    );
                    throttle.pause(options.pacing.error_backoff).await;
                }
            }
        }

        throttle.pause(options.pacing.request_delay).await;
        progress.inc(1);
    }

    progress.finish(format!(
        "Geocoded {} rows ({} from cache, {} failed)",
        report.rows, report.cache_hits, report.failed
    ));

    Ok(report)
}

fn set_point(
    table: &mut Table,
    row: usize,
    lat_col: usize,
    lon_col: usize,
    point: Option<Point>,
) {
    table.set(row, lat_col, point.map(|p| p.latitude.to_string()));
    table.set(row, lon_col, point.map(|p| p.longitude.to_string()));
}
