//! Enrichment driver: per-row nearest-amenity distances.
//!
//! Each row with valid coordinates goes through every requested category
//! in order: query the [`AmenitySource`], pick the nearest candidate, write
//! `dist_<category>_m` and `nearest_<category>_name`. Rows without usable
//! coordinates are skipped without any external call.
//!
//! A failed query only nulls that (row, category) pair; the driver logs it,
//! backs off, and moves on. There are no retries within a run. Amenity
//! results are never cached across runs, since amenities open and close
//! independently of listing addresses.

use std::collections::BTreeSet;
use std::sync::Arc;

use geo_valuation_amenity::{AmenityCategory, AmenityError, AmenitySource};
use geo_valuation_models::{DistanceResult, Point};
use geo_valuation_spatial::resolve_nearest;

use crate::EnrichError;
use crate::geocode::{LAT_COLUMN, LON_COLUMN};
use crate::progress::ProgressCallback;
use crate::table::Table;
use crate::throttle::{Pacing, Throttle};

/// Options for the enrichment driver.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Categories to resolve, in output column order.
    pub categories: Vec<AmenityCategory>,
    /// Search radius around each listing, in meters.
    pub radius_m: u32,
    /// Pause after each query, plus `error_backoff` after a failed one.
    pub pacing: Pacing,
}

impl EnrichOptions {
    /// Parses category names (see [`AmenityCategory::parse`]).
    ///
    /// Each category must have a distinct label, since the label names its
    /// output columns (`school` and `amenity=school` collide).
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Amenity`] for the first invalid name or the
    /// first name whose label was already taken.
    pub fn new<S: AsRef<str>>(
        names: &[S],
        radius_m: u32,
        pacing: Pacing,
    ) -> Result<Self, EnrichError> {
        let categories = names
            .iter()
            .map(|c| AmenityCategory::parse(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut labels = BTreeSet::new();
        for (raw, category) in names.iter().zip(&categories) {
            if !labels.insert(category.label()) {
                return Err(AmenityError::InvalidCategory(format!(
                    "{}: duplicate column label '{}'",
                    raw.as_ref(),
                    category.label()
                ))
                .into());
            }
        }
        Ok(Self {
            categories,
            radius_m,
            pacing,
        })
    }
}

/// What happened to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Missing or invalid coordinates; nothing was queried.
    Skipped,
    /// Every category was attempted.
    Done {
        /// Categories with a nearest amenity.
        resolved: usize,
        /// Categories with no candidate in range.
        empty: usize,
        /// Categories whose query failed.
        failed: usize,
    },
}

/// Result of enriching one row: the outcome plus one [`DistanceResult`]
/// per category, in category order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEnrichment {
    pub outcome: RowOutcome,
    pub results: Vec<DistanceResult>,
}

impl RowEnrichment {
    fn skipped(categories: usize) -> Self {
        Self {
            outcome: RowOutcome::Skipped,
            results: vec![DistanceResult::none(); categories],
        }
    }
}

/// Counts from one enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Rows in the input.
    pub rows: usize,
    /// Rows skipped for missing/invalid coordinates.
    pub skipped: usize,
    /// (row, category) pairs with a nearest amenity.
    pub resolved: usize,
    /// (row, category) pairs with no candidate in range.
    pub empty: usize,
    /// (row, category) pairs whose query failed.
    pub failed: usize,
}

impl EnrichReport {
    fn add(&mut self, outcome: RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Done {
                resolved,
                empty,
                failed,
            } => {
                self.resolved += resolved;
                self.empty += empty;
                self.failed += failed;
            }
        }
    }
}

/// Resolves every category for a single origin.
///
/// Never fails: a query error is logged and yields
/// [`DistanceResult::none`] for that category.
pub async fn enrich_point(
    origin: Point,
    source: &dyn AmenitySource,
    throttle: &dyn Throttle,
    options: &EnrichOptions,
) -> RowEnrichment {
    let mut results = Vec::with_capacity(options.categories.len());
    let (mut resolved, mut empty, mut failed) = (0, 0, 0);

    for category in &options.categories {
        let result = match source
            .candidates(origin, category, options.radius_m)
            .await
        {
            Ok(candidates) => {
                let result = resolve_nearest(origin, &candidates);
                if result.is_none() {
                    empty += 1;
                } else {
                    resolved += 1;
                }
                result
            }
            Err(e) => {
                log::error!(
                    "Amenity query failed for {category} at ({}, {}): {e}",
                    origin.latitude,
                    origin.longitude
                );
                if matches!(e, AmenityError::RateLimited) {
                    log::warn!("Rate limited by amenity service");
                }
                failed += 1;
                throttle.pause(options.pacing.error_backoff).await;
                DistanceResult::none()
            }
        };

        results.push(result);
        throttle.pause(options.pacing.request_delay).await;
    }

    RowEnrichment {
        outcome: RowOutcome::Done {
            resolved,
            empty,
            failed,
        },
        results,
    }
}

/// Enriches a list of origins. `None` entries are skipped.
pub async fn enrich_points(
    points: &[Option<Point>],
    source: &dyn AmenitySource,
    throttle: &dyn Throttle,
    options: &EnrichOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> (Vec<RowEnrichment>, EnrichReport) {
    let mut rows = Vec::with_capacity(points.len());
    let mut report = EnrichReport::default();

    progress.set_total(points.len() as u64);
    progress.set_message("Enriching amenities".to_string());

    for (idx, point) in points.iter().enumerate() {
        let row = match point {
            Some(origin) => enrich_point(*origin, source, throttle, options).await,
            None => {
                log::debug!("Row {idx}: no valid coordinates, skipping");
                RowEnrichment::skipped(options.categories.len())
            }
        };
        report.add(row.outcome);
        rows.push(row);
        progress.inc(1);
    }

    progress.finish(format!(
        "Enriched {} rows ({} skipped, {} failed lookups)",
        report.rows, report.skipped, report.failed
    ));

    (rows, report)
}

/// Adds distance/name columns for every category to `table`.
///
/// Existing columns with the same names are cleared and overwritten.
///
/// # Errors
///
/// Returns [`EnrichError::MissingColumn`] if `lat` or `lon` is absent.
/// Lookup failures never produce an error.
pub async fn enrich_table(
    table: &mut Table,
    source: &dyn AmenitySource,
    throttle: &dyn Throttle,
    options: &EnrichOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<EnrichReport, EnrichError> {
    let lat_col = table.require_column(LAT_COLUMN)?;
    let lon_col = table.require_column(LON_COLUMN)?;

    let points: Vec<Option<Point>> = (0..table.len())
        .map(|row| {
            let lat = table.get_f64(row, lat_col)?;
            let lon = table.get_f64(row, lon_col)?;
            Point::try_new(lat, lon)
        })
        .collect();

    let columns: Vec<(usize, usize)> = options
        .categories
        .iter()
        .map(|c| {
            (
                table.reset_column(&c.distance_column()),
                table.reset_column(&c.name_column()),
            )
        })
        .collect();

    let (rows, report) = enrich_points(&points, source, throttle, options, progress).await;

    for (row, enrichment) in rows.into_iter().enumerate() {
        for (&(dist_col, name_col), result) in columns.iter().zip(enrichment.results) {
            table.set(row, dist_col, result.distance_m.map(|d| d.to_string()));
            table.set(row, name_col, result.nearest_name);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use geo_valuation_models::AmenityCandidate;

    use super::*;
    use crate::progress::null_progress;
    use crate::throttle::testing::RecordingThrottle;

    /// Returns one candidate ~`offset` degrees north of the origin, named
    /// after the category. Origins listed in `failing_at` error instead.
    #[derive(Default)]
    struct FakeSource {
        failing_at: Vec<Point>,
        empty_for: Vec<String>,
        calls: Mutex<Vec<(Point, String)>>,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<(Point, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AmenitySource for FakeSource {
        async fn candidates(
            &self,
            origin: Point,
            category: &AmenityCategory,
            _radius_m: u32,
        ) -> Result<Vec<AmenityCandidate>, AmenityError> {
            self.calls
                .lock()
                .unwrap()
                .push((origin, category.label().to_string()));
            if self.failing_at.contains(&origin) {
                return Err(AmenityError::Parse {
                    message: "simulated outage".to_string(),
                });
            }
            if self.empty_for.iter().any(|c| c == category.label()) {
                return Ok(Vec::new());
            }
            Ok(vec![
                AmenityCandidate::new(
                    Some(format!("far {}", category.label())),
                    Point::new(origin.latitude + 0.01, origin.longitude),
                ),
                AmenityCandidate::new(
                    Some(format!("near {}", category.label())),
                    Point::new(origin.latitude + 0.001, origin.longitude),
                ),
            ])
        }
    }

    fn options(categories: &[&str]) -> EnrichOptions {
        EnrichOptions::new(categories, 2000, Pacing::from_millis(1000, 2000)).unwrap()
    }

    fn geocoded(rows: &[(&str, &str)]) -> Table {
        Table::new(
            vec!["address".into(), "lat".into(), "lon".into()],
            rows.iter()
                .enumerate()
                .map(|(i, (lat, lon))| vec![format!("listing {i}"), (*lat).into(), (*lon).into()])
                .collect(),
        )
    }

    #[tokio::test]
    async fn writes_distance_and_name_columns_in_category_order() {
        let mut table = geocoded(&[("12.9716", "77.5946")]);
        let source = FakeSource::default();

        let report = enrich_table(
            &mut table,
            &source,
            &RecordingThrottle::default(),
            &options(&["school", "hospital", "metro"]),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(
            &table.headers()[3..],
            &[
                "dist_school_m",
                "nearest_school_name",
                "dist_hospital_m",
                "nearest_hospital_name",
                "dist_metro_m",
                "nearest_metro_name",
            ]
        );
        assert_eq!(report.resolved, 3);
        assert_eq!(table.get(0, 4), Some("near school"));
        let d = table.get_f64(0, 3).unwrap();
        assert!((d - 111.2).abs() < 1.0, "Expected ~111 m, got {d}");

        let order: Vec<String> = source.calls().into_iter().map(|(_, c)| c).collect();
        assert_eq!(order, vec!["school", "hospital", "metro"]);
    }

    #[tokio::test]
    async fn failing_row_does_not_affect_neighbours() {
        let mut table = geocoded(&[
            ("12.9716", "77.5946"),
            ("12.9352", "77.6245"),
            ("13.0354", "77.5988"),
        ]);
        let source = FakeSource {
            failing_at: vec![Point::new(12.9352, 77.6245)],
            ..FakeSource::default()
        };

        let report = enrich_table(
            &mut table,
            &source,
            &RecordingThrottle::default(),
            &options(&["school"]),
            &null_progress(),
        )
        .await
        .unwrap();

        let dist = table.column("dist_school_m").unwrap();
        assert!(table.get_f64(0, dist).is_some());
        assert!(table.get_f64(1, dist).is_none());
        assert!(table.get_f64(2, dist).is_some());
        assert_eq!(report.failed, 1);
        assert_eq!(report.resolved, 2);
    }

    #[tokio::test]
    async fn rows_without_coordinates_are_never_queried() {
        let mut table = geocoded(&[("", "77.5946"), ("12.9716", "77.5946"), ("95.0", "10.0")]);
        let source = FakeSource::default();

        let report = enrich_table(
            &mut table,
            &source,
            &RecordingThrottle::default(),
            &options(&["school", "hospital"]),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 2);
        assert!(source
            .calls()
            .iter()
            .all(|(p, _)| *p == Point::new(12.9716, 77.5946)));
        for col in ["dist_school_m", "nearest_school_name", "dist_hospital_m"] {
            let idx = table.column(col).unwrap();
            assert_eq!(table.get(0, idx), None);
            assert_eq!(table.get(2, idx), None);
        }
    }

    #[tokio::test]
    async fn table_is_produced_when_every_call_fails() {
        let points = [Point::new(12.9716, 77.5946), Point::new(12.9352, 77.6245)];
        let mut table = geocoded(&[("12.9716", "77.5946"), ("12.9352", "77.6245")]);
        let source = FakeSource {
            failing_at: points.to_vec(),
            ..FakeSource::default()
        };

        let report = enrich_table(
            &mut table,
            &source,
            &RecordingThrottle::default(),
            &options(&["school", "metro"]),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed, 4);
        assert_eq!(table.headers().len(), 7);
        for row in 0..2 {
            for col in 3..7 {
                assert_eq!(table.get(row, col), None);
            }
        }
    }

    #[tokio::test]
    async fn empty_results_are_not_failures() {
        let source = FakeSource {
            empty_for: vec!["hospital".to_string()],
            ..FakeSource::default()
        };
        let (rows, report) = enrich_points(
            &[Some(Point::new(12.9716, 77.5946))],
            &source,
            &RecordingThrottle::default(),
            &options(&["school", "hospital"]),
            &null_progress(),
        )
        .await;

        assert_eq!(
            rows[0].outcome,
            RowOutcome::Done {
                resolved: 1,
                empty: 1,
                failed: 0
            }
        );
        assert!(rows[0].results[1].is_none());
        assert_eq!(report.empty, 1);
    }

    #[tokio::test]
    async fn pauses_after_every_call_and_backs_off_after_errors() {
        let origin = Point::new(12.9716, 77.5946);
        let throttle = RecordingThrottle::default();
        let ok = FakeSource::default();
        enrich_point(origin, &ok, &throttle, &options(&["school"])).await;
        assert_eq!(throttle.pauses(), vec![Duration::from_secs(1)]);

        let throttle = RecordingThrottle::default();
        let failing = FakeSource {
            failing_at: vec![origin],
            ..FakeSource::default()
        };
        enrich_point(origin, &failing, &throttle, &options(&["school"])).await;
        assert_eq!(
            throttle.pauses(),
            vec![Duration::from_secs(2), Duration::from_secs(1)]
        );
        assert_eq!(throttle.total(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn existing_columns_are_overwritten() {
        let mut table = Table::new(
            vec![
                "lat".into(),
                "lon".into(),
                "dist_school_m".into(),
                "nearest_school_name".into(),
            ],
            vec![
                vec!["".into(), "".into(), "999".into(), "stale".into()],
                vec!["12.9716".into(), "77.5946".into(), "999".into(), "stale".into()],
            ],
        );

        enrich_table(
            &mut table,
            &FakeSource::default(),
            &RecordingThrottle::default(),
            &options(&["school"]),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(table.headers().len(), 4);
        assert_eq!(table.get(0, 2), None);
        assert_eq!(table.get(0, 3), None);
        assert_eq!(table.get(1, 3), Some("near school"));
    }

    #[tokio::test]
    async fn missing_coordinate_columns_are_fatal() {
        let mut table = Table::new(vec!["address".into()], vec![vec!["MG Road".into()]]);
        let source = FakeSource::default();

        let result = enrich_table(
            &mut table,
            &source,
            &RecordingThrottle::default(),
            &options(&["school"]),
            &null_progress(),
        )
        .await;

        assert!(matches!(
            result,
            Err(EnrichError::MissingColumn { column }) if column == "lat"
        ));
        assert!(source.calls().is_empty());
    }

    #[test]
    fn categories_sharing_a_label_are_rejected() {
        for pair in [["school", "amenity=school"], ["leisure=park", "amenity=park"]] {
            let result = EnrichOptions::new(&pair, 2000, Pacing::from_millis(0, 0));
            assert!(
                matches!(result, Err(EnrichError::Amenity(AmenityError::InvalidCategory(_)))),
                "{pair:?} should collide"
            );
        }

        let distinct =
            EnrichOptions::new(&["school", "leisure=park"], 2000, Pacing::from_millis(0, 0))
                .unwrap();
        assert_eq!(distinct.categories.len(), 2);
    }

    #[test]
    fn invalid_category_is_rejected_up_front() {
        let result = EnrichOptions::new(&["school", "bad name"], 2000, Pacing::from_millis(0, 0));
        assert!(matches!(result, Err(EnrichError::Amenity(_))));
    }
}
