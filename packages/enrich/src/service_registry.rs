//! Compile-time registry of external service configurations.
//!
//! Each external service is defined in a TOML file under `services/`. The
//! registry embeds these at compile time and exposes them via
//! [`all_services`], [`nominatim`], and [`overpass`].

use std::time::Duration;

use serde::Deserialize;

/// An external service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalService {
    /// Unique identifier (e.g., `"nominatim"`, `"overpass"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim(NominatimConfig),
    /// Overpass point-of-interest API.
    Overpass(OverpassConfig),
}

/// Settings for the Nominatim geocoder.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimConfig {
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// Minimum delay after each request in milliseconds.
    pub rate_limit_ms: u64,
    /// Extra delay after an HTTP 429 answer in milliseconds.
    #[serde(default)]
    pub rate_limited_backoff_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` template; `{email}` is replaced with the operator's
    /// contact address.
    pub user_agent: String,
}

impl NominatimConfig {
    /// Renders the `User-Agent` header for `email`.
    #[must_use]
    pub fn user_agent_for(&self, email: &str) -> String {
        self.user_agent.replace("{email}", email)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the Overpass API.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter endpoint (e.g., `"https://overpass-api.de/api/interpreter"`).
    pub base_url: String,
    /// Minimum delay after each request in milliseconds.
    pub rate_limit_ms: u64,
    /// Extra delay after a failed request in milliseconds.
    #[serde(default)]
    pub error_backoff_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Search radius used when the caller does not pick one.
    pub default_radius_m: u32,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl OverpassConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExternalService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim(NominatimConfig { base_url, .. })
            | ProviderConfig::Overpass(OverpassConfig { base_url, .. }) => base_url,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("overpass", include_str!("../services/overpass.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all external service configurations.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<ExternalService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse service config '{name}': {e}"))
        })
        .collect()
}

/// Returns the Nominatim configuration.
///
/// # Panics
///
/// Panics if no embedded service has a Nominatim provider.
#[must_use]
pub fn nominatim() -> NominatimConfig {
    all_services()
        .into_iter()
        .find_map(|s| match s.provider {
            ProviderConfig::Nominatim(cfg) => Some(cfg),
            ProviderConfig::Overpass(_) => None,
        })
        .unwrap_or_else(|| panic!("No Nominatim service configured"))
}

/// Returns the Overpass configuration.
///
/// # Panics
///
/// Panics if no embedded service has an Overpass provider.
#[must_use]
pub fn overpass() -> OverpassConfig {
    all_services()
        .into_iter()
        .find_map(|s| match s.provider {
            ProviderConfig::Overpass(cfg) => Some(cfg),
            ProviderConfig::Nominatim(_) => None,
        })
        .unwrap_or_else(|| panic!("No Overpass service configured"))
}
