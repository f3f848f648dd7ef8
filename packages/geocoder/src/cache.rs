//! File-backed geocode cache.
//!
//! Stores one row per query string in a CSV file with the columns
//! `query,lat,lon,display_name`. Both successful geocodes and "no match"
//! answers (empty `lat`/`lon`) are cached, so neither is sent to the
//! geocoder again.
//!
//! Every [`GeocodeCache::record`] rewrites the whole file (write-through)
//! via a temporary file and a rename.
//!
//! Concurrent processes sharing one cache file are not coordinated: the
//! last writer wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo_valuation_models::{CacheEntry, Point};
use serde::{Deserialize, Serialize};

/// Errors that can occur while persisting the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error (directory creation, rename).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// On-disk row layout.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    query: String,
    lat: Option<f64>,
    lon: Option<f64>,
    display_name: Option<String>,
}

impl From<CacheRow> for CacheEntry {
    fn from(row: CacheRow) -> Self {
        let point = match (row.lat, row.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Point::new(lat, lon))
            }
            _ => None,
        };
        Self {
            query: row.query,
            point,
            display_name: row.display_name.filter(|s| !s.is_empty()),
        }
    }
}

impl From<&CacheEntry> for CacheRow {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            query: entry.query.clone(),
            lat: entry.point.map(|p| p.latitude),
            lon: entry.point.map(|p| p.longitude),
            display_name: entry.display_name.clone(),
        }
    }
}

/// Exact-match query → coordinate cache.
///
/// Keys are compared verbatim; two queries that differ only in spacing or
/// case are different keys. Each query appears at most once: loading keeps
/// the first row for a query, and recording an existing query replaces its
/// entry in place.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    path: Option<PathBuf>,
    entries: Vec<CacheEntry>,
    index: BTreeMap<String, usize>,
}

impl GeocodeCache {
    /// Opens the cache stored at `path`.
    ///
    /// A missing or unreadable file yields an empty cache rather than an
    /// error; the file is (re)created on the first [`record`](Self::record).
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut cache = Self {
            path: Some(path.clone()),
            ..Self::default()
        };

        if !path.exists() {
            log::debug!("No geocode cache at {}, starting empty", path.display());
            return cache;
        }

        match load_rows(&path) {
            Ok(rows) => {
                let total = rows.len();
                for row in rows {
                    cache.insert_first(row.into());
                }
                if total > cache.entries.len() {
                    log::info!(
                        "Geocode cache {}: ignored {} duplicate rows",
                        path.display(),
                        total - cache.entries.len()
                    );
                }
                log::info!(
                    "Loaded {} geocode cache entries from {}",
                    cache.entries.len(),
                    path.display()
                );
            }
            Err(e) => {
                log::warn!(
                    "Could not read geocode cache {}: {e}; starting empty",
                    path.display()
                );
            }
        }

        cache
    }

    /// Creates a cache that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Location of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of distinct queries in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for exactly `query`, if one was recorded.
    #[must_use]
    pub fn lookup(&self, query: &str) -> Option<&CacheEntry> {
        self.index.get(query).map(|&i| &self.entries[i])
    }

    /// Records `entry` and immediately rewrites the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file cannot be written. The in-memory
    /// state already contains the entry at that point.
    pub fn record(&mut self, entry: CacheEntry) -> Result<(), CacheError> {
        if let Some(&i) = self.index.get(&entry.query) {
            self.entries[i] = entry;
        } else {
            self.index.insert(entry.query.clone(), self.entries.len());
            self.entries.push(entry);
        }
        self.persist()
    }

    fn insert_first(&mut self, entry: CacheEntry) {
        if self.index.contains_key(&entry.query) {
            return;
        }
        self.index.insert(entry.query.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Writes all entries to a sibling temp file, then renames it over the
    /// cache file so readers never observe a half-written cache.
    fn persist(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for entry in &self.entries {
                writer.serialize(CacheRow::from(entry))?;
            }
            writer.flush()?;
        }

        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn load_rows(path: &Path) -> Result<Vec<CacheRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CacheRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!("Skipping malformed geocode cache row {}: {e}", line + 1),
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache_path(label: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("geo_valuation_cache_{label}_{}", uuid::Uuid::new_v4()))
            .join("geocode_cache.csv")
    }

    #[test]
    fn missing_file_starts_empty() {
        let path = temp_cache_path("missing");
        let cache = GeocodeCache::open(&path);
        assert!(cache.is_empty());
        assert!(cache.lookup("anything").is_none());
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_rewritten() {
        let path = temp_cache_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "\u{1}garbage;;header\nnot,a,cache,row,at,all\n").unwrap();

        let mut cache = GeocodeCache::open(&path);
        assert!(cache.is_empty());

        cache
            .record(CacheEntry::hit(
                "Indiranagar, Bangalore",
                Point::new(12.9784, 77.6408),
                None,
            ))
            .unwrap();
        let reopened = GeocodeCache::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.lookup("Indiranagar, Bangalore").unwrap().point,
            Some(Point::new(12.9784, 77.6408))
        );

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn record_then_lookup_is_idempotent() {
        let path = temp_cache_path("idempotent");
        let mut cache = GeocodeCache::open(&path);
        cache
            .record(CacheEntry::hit(
                "MG Road, Bangalore",
                Point::new(12.9756, 77.6050),
                Some("MG Road".to_string()),
            ))
            .unwrap();

        for _ in 0..3 {
            let entry = cache.lookup("MG Road, Bangalore").unwrap();
            assert_eq!(entry.point, Some(Point::new(12.9756, 77.6050)));
        }

        let reopened = GeocodeCache::open(&path);
        let entry = reopened.lookup("MG Road, Bangalore").unwrap();
        assert_eq!(entry.point, Some(Point::new(12.9756, 77.6050)));
        assert_eq!(entry.display_name.as_deref(), Some("MG Road"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn misses_are_persisted() {
        let path = temp_cache_path("miss");
        let mut cache = GeocodeCache::open(&path);
        cache.record(CacheEntry::miss("Nowhere Lane, Atlantis")).unwrap();

        let reopened = GeocodeCache::open(&path);
        let entry = reopened.lookup("Nowhere Lane, Atlantis").unwrap();
        assert!(entry.point.is_none());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn keys_are_exact_strings() {
        let mut cache = GeocodeCache::in_memory();
        cache
            .record(CacheEntry::hit(
                "Koramangala, Bangalore",
                Point::new(12.93, 77.62),
                None,
            ))
            .unwrap();
        assert!(cache.lookup("koramangala, bangalore").is_none());
        assert!(cache.lookup("Koramangala,  Bangalore").is_none());
        assert!(cache.lookup("Koramangala, Bangalore").is_some());
    }

    #[test]
    fn recording_existing_query_replaces_it() {
        let mut cache = GeocodeCache::in_memory();
        cache.record(CacheEntry::miss("HSR Layout")).unwrap();
        cache
            .record(CacheEntry::hit("HSR Layout", Point::new(12.91, 77.64), None))
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup("HSR Layout").unwrap().point,
            Some(Point::new(12.91, 77.64))
        );
    }

    #[test]
    fn duplicate_rows_on_disk_use_first_match() {
        let path = temp_cache_path("dupes");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "query,lat,lon,display_name\n\
             Jayanagar,12.925,77.593,first\n\
             Jayanagar,0.0,0.0,second\n\
             Hebbal,,,\n",
        )
        .unwrap();

        let cache = GeocodeCache::open(&path);
        assert_eq!(cache.len(), 2);
        let entry = cache.lookup("Jayanagar").unwrap();
        assert_eq!(entry.display_name.as_deref(), Some("first"));
        assert!(cache.lookup("Hebbal").unwrap().point.is_none());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = std::env::temp_dir().join(format!(
            "geo_valuation_cache_blocked_{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not_a_dir");
        std::fs::write(&blocker, "").unwrap();

        let mut cache = GeocodeCache::open(blocker.join("geocode_cache.csv"));
        let result = cache.record(CacheEntry::miss("Yelahanka"));
        assert!(result.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
