//! Overpass API client for nearby points of interest.
//!
//! Sends one `around:` query per (origin, category) covering nodes, ways,
//! and relations. Ways and relations come back with their `center` (via
//! `out center;`), so every element maps to a single point.
//!
//! The public instance asks clients to keep well under one query per
//! second; rate limiting is the caller's job.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::time::Duration;

use async_trait::async_trait;
use geo_valuation_models::{AmenityCandidate, Point};

use crate::{AmenityCategory, AmenityError, AmenitySource};

/// Default public interpreter endpoint.
pub const DEFAULT_BASE_URL: &str = "https://overpass-api.de/api/interpreter";

/// Server-side query timeout in seconds (the `[timeout:..]` setting).
const QUERY_TIMEOUT_SECS: u32 = 25;

/// Overpass interpreter client.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
}

impl OverpassClient {
    /// Builds a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AmenityError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, AmenityError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Base URL this client sends queries to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AmenitySource for OverpassClient {
    async fn candidates(
        &self,
        origin: Point,
        category: &AmenityCategory,
        radius_m: u32,
    ) -> Result<Vec<AmenityCandidate>, AmenityError> {
        let (key, value) = category.query_tag();
        let query = build_query(origin, key, value, radius_m);
        log::trace!("Overpass query for {category}:\n{query}");

        let resp = self
            .client
            .post(&self.base_url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AmenityError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_elements(&body, category)
    }
}

/// Builds an Overpass QL union of nodes, ways, and relations tagged
/// `key=value` within `radius_m` meters of `origin`.
#[must_use]
pub fn build_query(origin: Point, key: &str, value: &str, radius_m: u32) -> String {
    let around = format!(
        "[\"{key}\"=\"{value}\"](around:{radius_m},{},{})",
        origin.latitude, origin.longitude
    );
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n\
         (\n  node{around};\n  way{around};\n  relation{around};\n);\n\
         out center;"
    )
}

/// Extracts candidates from an Overpass JSON response.
///
/// Elements with neither a coordinate nor a center are dropped, as are
/// elements the category's filter rejects.
///
/// # Errors
///
/// Returns [`AmenityError::Parse`] if the body has no `elements` array.
pub fn parse_elements(
    body: &serde_json::Value,
    category: &AmenityCategory,
) -> Result<Vec<AmenityCandidate>, AmenityError> {
    let elements = body["elements"]
        .as_array()
        .ok_or_else(|| AmenityError::Parse {
            message: "Overpass response has no elements array".to_string(),
        })?;

    let mut out = Vec::with_capacity(elements.len());

    for el in elements {
        let tags = el["tags"].as_object();
        if !category.accepts(tags) {
            continue;
        }

        let Some(point) = element_point(el) else {
            log::trace!("Skipping Overpass element without coordinates: {}", el["id"]);
            continue;
        };

        let name = tags
            .and_then(|t| t.get("name"))
            .and_then(serde_json::Value::as_str)
            .map(String::from);

        out.push(AmenityCandidate::new(name, point));
    }

    Ok(out)
}

/// A node's own coordinate, otherwise the way/relation center.
fn element_point(el: &serde_json::Value) -> Option<Point> {
    if let (Some(lat), Some(lon)) = (el["lat"].as_f64(), el["lon"].as_f64()) {
        return Some(Point::new(lat, lon));
    }
    let center = &el["center"];
    match (center["lat"].as_f64(), center["lon"].as_f64()) {
        (Some(lat), Some(lon)) => Some(Point::new(lat, lon)),
        _ => None,
    }
}
