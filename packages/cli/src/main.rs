#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for listing geocoding and amenity enrichment.
//!
//! `geocode` adds `geo_query`/`lat`/`lon` to a listings CSV, `amenities`
//! adds nearest-amenity distance columns to a geocoded CSV, and `pipeline`
//! runs both in one go. Per-row failures are logged and leave empty cells;
//! the process exits non-zero only for setup errors.

mod progress;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use geo_valuation_amenity::overpass::OverpassClient;
use geo_valuation_enrich::amenities::{EnrichOptions, enrich_table};
use geo_valuation_enrich::geocode::{GeocodeOptions, geocode_table};
use geo_valuation_enrich::service_registry;
use geo_valuation_enrich::table::Table;
use geo_valuation_enrich::throttle::{Pacing, TokioThrottle};
use geo_valuation_geocoder::cache::GeocodeCache;
use geo_valuation_geocoder::nominatim::NominatimClient;
use indicatif::MultiProgress;

use crate::progress::{IndicatifProgress, init_logger};

const DEFAULT_CACHE_PATH: &str = "data/processed/geocode_cache.csv";

#[derive(Parser)]
#[command(
    name = "geo_valuation",
    about = "Geocode property listings and measure distances to nearby amenities"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode listing addresses into `lat`/`lon` columns via Nominatim
    Geocode {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        geocode: GeocodeArgs,
        /// Pause after each Nominatim request, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Add nearest-amenity distance/name columns via Overpass
    Amenities {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        amenities: AmenityArgs,
        /// Pause after each Overpass request, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Geocode, then add amenity columns, in a single run
    Pipeline {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        geocode: GeocodeArgs,
        #[command(flatten)]
        amenities: AmenityArgs,
        /// Pause after each Nominatim request, in milliseconds
        #[arg(long)]
        geocode_delay_ms: Option<u64>,
        /// Pause after each Overpass request, in milliseconds
        #[arg(long)]
        amenity_delay_ms: Option<u64>,
        /// Also save the intermediate geocoded table here
        #[arg(long)]
        geocoded_csv: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input CSV with a header row
    #[arg(long, alias = "in_csv")]
    in_csv: PathBuf,
    /// Output CSV (parent directories are created)
    #[arg(long, alias = "out_csv")]
    out_csv: PathBuf,
}

#[derive(Args)]
struct GeocodeArgs {
    /// Contact e-mail sent in the `User-Agent`, as Nominatim's usage policy requires
    #[arg(long)]
    email: String,
    /// Column holding the address or locality
    #[arg(long, alias = "addr_col", default_value = "address")]
    addr_col: String,
    /// Column holding the city; ignored when absent from the input
    #[arg(long, alias = "city_col", default_value = "city")]
    city_col: String,
    /// Geocode cache file
    #[arg(long, default_value = DEFAULT_CACHE_PATH)]
    cache: PathBuf,
}

#[derive(Args)]
struct AmenityArgs {
    /// Amenity categories: `metro`, an `amenity=*` value like `school`, or `key=value`
    #[arg(long, num_args = 1.., default_values = ["school", "hospital", "metro"])]
    amenities: Vec<String>,
    /// Search radius in meters
    #[arg(long)]
    radius: Option<u32>,
    /// Extra pause after a failed Overpass request, in milliseconds
    #[arg(long)]
    error_backoff_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Geocode {
            io,
            geocode,
            delay_ms,
        } => {
            let mut table = read_table(&io.in_csv)?;
            geocode_pass(&mut table, &geocode, delay_ms, &multi).await?;
            save_table(&table, &io.out_csv, "geocoded")?;
        }
        Commands::Amenities {
            io,
            amenities,
            delay_ms,
        } => {
            let mut table = read_table(&io.in_csv)?;
            amenity_pass(&mut table, &amenities, delay_ms, &multi).await?;
            save_table(&table, &io.out_csv, "enriched")?;
        }
        Commands::Pipeline {
            io,
            geocode,
            amenities,
            geocode_delay_ms,
            amenity_delay_ms,
            geocoded_csv,
        } => {
            let mut table = read_table(&io.in_csv)?;
            // Parse categories before spending time on geocoding.
            amenity_options(&amenities, amenity_delay_ms)?;
            geocode_pass(&mut table, &geocode, geocode_delay_ms, &multi).await?;
            if let Some(path) = geocoded_csv {
                save_table(&table, &path, "geocoded")?;
            }
            amenity_pass(&mut table, &amenities, amenity_delay_ms, &multi).await?;
            save_table(&table, &io.out_csv, "enriched")?;
        }
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn read_table(path: &Path) -> Result<Table, Box<dyn std::error::Error>> {
    let table = Table::read_csv(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    log::info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

fn save_table(table: &Table, path: &Path, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    table.write_csv(path)?;
    log::info!("Saved {what} file -> {}", path.display());
    Ok(())
}

async fn geocode_pass(
    table: &mut Table,
    args: &GeocodeArgs,
    delay_ms: Option<u64>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = service_registry::nominatim();
    let geocoder = NominatimClient::new(
        config.base_url.clone(),
        config.user_agent_for(&args.email),
        config.timeout(),
    )?;

    let mut cache = GeocodeCache::open(args.cache.clone());
    log::info!(
        "Geocode cache {} holds {} entries",
        args.cache.display(),
        cache.len()
    );

    let options = GeocodeOptions {
        address_column: args.addr_col.clone(),
        city_column: Some(args.city_col.clone()),
        pacing: Pacing::from_millis(
            delay_ms.unwrap_or(config.rate_limit_ms),
            config.rate_limited_backoff_ms,
        ),
    };

    let progress = IndicatifProgress::rows_bar(multi, "Geocoding");
    let report =
        geocode_table(table, &geocoder, &mut cache, &TokioThrottle, &options, &progress).await?;

    log::info!(
        "Geocoded {} rows: {} from cache, {} resolved, {} not found, {} failed, {} skipped",
        report.rows,
        report.cache_hits,
        report.resolved,
        report.not_found,
        report.failed,
        report.skipped
    );
    Ok(())
}

fn amenity_options(
    args: &AmenityArgs,
    delay_ms: Option<u64>,
) -> Result<EnrichOptions, Box<dyn std::error::Error>> {
    let config = service_registry::overpass();
    let pacing = Pacing::from_millis(
        delay_ms.unwrap_or(config.rate_limit_ms),
        args.error_backoff_ms.unwrap_or(config.error_backoff_ms),
    );
    let options = EnrichOptions::new(
        args.amenities.as_slice(),
        args.radius.unwrap_or(config.default_radius_m),
        pacing,
    )?;
    Ok(options)
}

async fn amenity_pass(
    table: &mut Table,
    args: &AmenityArgs,
    delay_ms: Option<u64>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = amenity_options(args, delay_ms)?;
    let config = service_registry::overpass();
    let source = OverpassClient::new(
        config.base_url.clone(),
        &config.user_agent,
        config.timeout(),
    )?;

    log::info!(
        "Enriching with {} within {} m",
        options
            .categories
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        options.radius_m
    );

    let progress = IndicatifProgress::rows_bar(multi, "Amenities");
    let report = enrich_table(table, &source, &TokioThrottle, &options, &progress).await?;

    log::info!(
        "Enriched {} rows: {} distances, {} with nothing in range, {} failed lookups, {} skipped rows",
        report.rows,
        report.resolved,
        report.empty,
        report.failed,
        report.skipped
    );
    Ok(())
}
