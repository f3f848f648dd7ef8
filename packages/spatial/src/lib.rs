#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Great-circle distance and nearest-candidate selection.
//!
//! Used by the enrichment driver to turn the raw candidates returned by an
//! amenity query into a single [`DistanceResult`] per category.

use geo_valuation_models::{AmenityCandidate, DistanceResult, Point};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters.
///
/// Inputs are not range-checked; out-of-range coordinates give an
/// unspecified (but finite) result. Rounding near antipodal points is
/// clamped, so the result never exceeds half the Earth's circumference.
#[must_use]
pub fn haversine_m(a: Point, b: Point) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0)
        .sin()
        .mul_add((d_phi / 2.0).sin(), phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2))
        .clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Finds the candidate closest to `origin`.
///
/// Returns the index of the winner and its distance. Ties keep the first
/// candidate in input order, so the result is deterministic for a given
/// response ordering.
#[must_use]
pub fn nearest(origin: Point, candidates: &[AmenityCandidate]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, candidate) in candidates.iter().enumerate() {
        let d = haversine_m(origin, candidate.point);
        match best {
            None => best = Some((idx, d)),
            Some((_, best_d)) if d < best_d => best = Some((idx, d)),
            _ => {}
        }
    }

    best
}

/// Resolves the nearest candidate into a [`DistanceResult`].
///
/// An empty candidate list is not an error; it yields
/// [`DistanceResult::none`].
#[must_use]
pub fn resolve_nearest(origin: Point, candidates: &[AmenityCandidate]) -> DistanceResult {
    let Some((idx, distance_m)) = nearest(origin, candidates) else {
        return DistanceResult::none();
    };

    let winner = &candidates[idx];
    log::trace!(
        "Nearest of {} candidates: {:?} at {distance_m:.1} m",
        candidates.len(),
        winner.name
    );

    DistanceResult {
        distance_m: Some(distance_m),
        nearest_name: winner.name.clone(),
    }
}
