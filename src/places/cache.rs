//! File-based geocode cache at ~/.gymloc/geocode.json.
//!
//! TTL: 30 days. Case-insensitive, whitespace-normalised keys.
//! Entries written without `formatted_address` load fine.

use super::types::GeocodeResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CACHE_TTL_MS: i64 = 30 * 24 * 3600 * 1000;

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    lat: f64,
    lng: f64,
    timestamp: i64,
    #[serde(default)]
    formatted_address: Option<String>,
}

pub struct GeocodeCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl GeocodeCache {
    /// Load the cache from ~/.gymloc/geocode.json.
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        log::debug!("geocode cache {}: {} entries", path.display(), entries.len());
        Self { path, entries }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gymloc")
            .join("geocode.json")
    }

    fn read_file(path: &Path) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entries) => Some(entries),
            Err(e) => {
                log::warn!("ignoring unreadable geocode cache {}: {}", path.display(), e);
                None
            }
        }
    }

    fn key(address: &str) -> String {
        address
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Cached result for `address`, unless missing or expired.
    pub fn get(&self, address: &str) -> Option<GeocodeResult> {
        let entry = self.entries.get(&Self::key(address))?;

        let now = chrono::Utc::now().timestamp_millis();
        if now.saturating_sub(entry.timestamp) > CACHE_TTL_MS {
            return None;
        }

        Some(GeocodeResult {
            lat: entry.lat,
            lng: entry.lng,
            formatted_address: entry.formatted_address.clone(),
        })
    }

    /// Store a result under `address` and persist to disk.
    pub fn put(&mut self, address: &str, result: &GeocodeResult) {
        let entry = CacheEntry {
            lat: result.lat,
            lng: result.lng,
            timestamp: chrono::Utc::now().timestamp_millis(),
            formatted_address: result.formatted_address.clone(),
        };
        self.entries.insert(Self::key(address), entry);
        self.persist();
    }

    /// Drop expired entries; returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let before = self.entries.len();
        self.entries.retain(|_, e| now.saturating_sub(e.timestamp) <= CACHE_TTL_MS);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("cannot create {}: {}", parent.display(), e);
                return;
            }
        }
        let written = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            log::warn!("cannot write geocode cache {}: {}", self.path.display(), e);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache() -> (GeocodeCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        (GeocodeCache::load_from(path), dir)
    }

    fn toronto() -> GeocodeResult {
        GeocodeResult {
            lat: 43.6532,
            lng: -79.3832,
            formatted_address: Some("Toronto, ON, Canada".into()),
        }
    }

    #[test]
    fn test_put_get() {
        let (mut cache, _dir) = test_cache();
        cache.put("Toronto downtown", &toronto());

        let r = cache.get("toronto downtown").unwrap();
        assert!((r.lat - 43.6532).abs() < 1e-9);
        assert_eq!(r.formatted_address.as_deref(), Some("Toronto, ON, Canada"));
    }

    #[test]
    fn test_key_normalised() {
        let (mut cache, _dir) = test_cache();
        cache.put("  Toronto   Downtown ", &toronto());
        assert!(cache.get("TORONTO DOWNTOWN").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss() {
        let (cache, _dir) = test_cache();
        assert!(cache.get("nowhere").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("geocode.json");
        {
            let mut cache = GeocodeCache::load_from(path.clone());
            cache.put("Oakland", &toronto());
        }
        let cache = GeocodeCache::load_from(path);
        assert!(cache.get("oakland").is_some());
    }

    #[test]
    fn test_expired_and_prune() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        fs::write(
            &path,
            r#"{
                "old": {"lat": 1.0, "lng": 2.0, "timestamp": 0},
                "fresh": {"lat": 3.0, "lng": 4.0, "timestamp": 99999999999999}
            }"#,
        )
        .unwrap();

        let mut cache = GeocodeCache::load_from(path);
        assert!(cache.get("old").is_none());
        let fresh = cache.get("fresh").unwrap();
        assert!(fresh.formatted_address.is_none());

        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_extreme_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        fs::write(
            &path,
            r#"{
                "ancient": {"lat": 1.0, "lng": 2.0, "timestamp": -9223372036854775808},
                "future": {"lat": 3.0, "lng": 4.0, "timestamp": 9223372036854775807}
            }"#,
        )
        .unwrap();

        let mut cache = GeocodeCache::load_from(path);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("ancient").is_none());
        assert!(cache.get("future").is_some());
        assert_eq!(cache.prune(), 1);
        assert!(cache.get("future").is_some());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        fs::write(&path, "not json").unwrap();
        let cache = GeocodeCache::load_from(path);
        assert!(cache.is_empty());
    }
}
