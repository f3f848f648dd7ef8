//! Amenity categories and their `OpenStreetMap` tag mapping.
//!
//! Most categories are a strict tag match: `school` means `amenity=school`.
//! Transit is the exception. Open data rarely tags metro stations
//! consistently, so the transit category queries every `railway=station`
//! and then accepts a station whose name mentions "metro", which is tagged
//! `subway=yes`, or which is simply tagged as a station.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::AmenityError;

/// Allowed characters for tag keys, values, and category labels. Keeps
/// user input from breaking out of the quoted Overpass filter.
static TAG_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_:\-]+$").expect("valid regex"));

/// Names accepted for the transit category.
const TRANSIT_ALIASES: &[&str] = &["metro", "transit", "subway"];

/// Keyword looked for in station names.
const TRANSIT_NAME_KEYWORD: &str = "metro";

/// A kind of amenity to measure distance to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmenityCategory {
    /// Strict `key=value` tag match.
    Tag {
        /// Column label (`dist_<label>_m`).
        label: String,
        /// OSM tag key (e.g. `amenity`).
        key: String,
        /// OSM tag value (e.g. `school`).
        value: String,
    },
    /// Railway stations filtered with the metro heuristic.
    Transit {
        /// Column label (`dist_<label>_m`).
        label: String,
    },
}

impl AmenityCategory {
    /// Parses a category name.
    ///
    /// * `metro`, `transit`, `subway` → transit heuristic
    /// * `school` → `amenity=school`
    /// * `leisure=park` → `leisure=park`, labelled `park`
    ///
    /// # Errors
    ///
    /// Returns [`AmenityError::InvalidCategory`] for empty input or
    /// characters outside `[A-Za-z0-9_:-]`.
    pub fn parse(raw: &str) -> Result<Self, AmenityError> {
        let raw = raw.trim();
        let invalid = || AmenityError::InvalidCategory(raw.to_string());

        if let Some((key, value)) = raw.split_once('=') {
            let (key, value) = (key.trim(), value.trim());
            if !TAG_TOKEN_RE.is_match(key) || !TAG_TOKEN_RE.is_match(value) {
                return Err(invalid());
            }
            return Ok(Self::Tag {
                label: value.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        if !TAG_TOKEN_RE.is_match(raw) {
            return Err(invalid());
        }

        if TRANSIT_ALIASES.iter().any(|a| raw.eq_ignore_ascii_case(a)) {
            return Ok(Self::Transit {
                label: raw.to_string(),
            });
        }

        Ok(Self::Tag {
            label: raw.to_string(),
            key: "amenity".to_string(),
            value: raw.to_string(),
        })
    }

    /// Label used in output column names.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Tag { label, .. } | Self::Transit { label } => label,
        }
    }

    /// The tag sent to the POI database.
    #[must_use]
    pub fn query_tag(&self) -> (&str, &str) {
        match self {
            Self::Tag { key, value, .. } => (key, value),
            Self::Transit { .. } => ("railway", "station"),
        }
    }

    /// Name of the distance column, e.g. `dist_school_m`.
    #[must_use]
    pub fn distance_column(&self) -> String {
        format!("dist_{}_m", self.label())
    }

    /// Name of the nearest-name column, e.g. `nearest_school_name`.
    #[must_use]
    pub fn name_column(&self) -> String {
        format!("nearest_{}_name", self.label())
    }

    /// Whether an element with these tags counts as a candidate.
    ///
    /// Tag categories accept everything the query returned. Transit accepts
    /// a metro-named station, a `subway=yes` element, or any
    /// `railway=station`.
    #[must_use]
    pub fn accepts(&self, tags: Option<&serde_json::Map<String, serde_json::Value>>) -> bool {
        match self {
            Self::Tag { .. } => true,
            Self::Transit { .. } => {
                let Some(tags) = tags else {
                    return false;
                };
                let tag = |k: &str| tags.get(k).and_then(serde_json::Value::as_str);

                tag("name").is_some_and(|n| n.to_lowercase().contains(TRANSIT_NAME_KEYWORD))
                    || tag("subway") == Some("yes")
                    || tag("railway") == Some("station")
            }
        }
    }
}

impl FromStr for AmenityCategory {
    type Err = AmenityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AmenityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, value) = self.query_tag();
        write!(f, "{} ({key}={value})", self.label())
    }
}
