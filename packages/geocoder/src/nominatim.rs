//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Nominatim has strict usage rules: **1 request per second** maximum and a
//! `User-Agent` that identifies the application and a contact address.
//! Rate limiting is the caller's job (see the geocoding pass in
//! `geo_valuation_enrich`).
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use geo_valuation_models::Point;

use crate::{GeocodeError, GeocodedAddress, Geocoder};

/// Default public search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Nominatim search client.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimClient {
    /// Builds a client for `base_url`.
    ///
    /// `user_agent` is sent with every request; the public instance rejects
    /// requests without a meaningful one.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        })
    }

    /// Base URL this client sends requests to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        geocode_freeform(&self.client, &self.base_url, &self.user_agent, query).await
    }
}

/// Geocodes a free-form query (address plus locality) using Nominatim.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails, the server answers
/// with a non-success status, or the response cannot be parsed.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    user_agent: &str,
    query: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let resp = client
        .get(base_url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("addressdetails", "0"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.error_for_status()?.json().await?;
    parse_response(&body)
}

/// Parses a Nominatim JSON response, taking the first (best) result.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(first, "lat")?;
    let lon = coordinate(first, "lon")?;
    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        point: Point::new(lat, lon),
        display_name,
    }))
}

/// Nominatim encodes coordinates as strings; accept plain numbers too.
fn coordinate(result: &serde_json::Value, field: &str) -> Result<f64, GeocodeError> {
    let value = &result[field];
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .ok_or_else(|| GeocodeError::Parse {
            message: format!("Missing {field} in Nominatim response"),
        })
}
