//! Element set disk cache
//!
//! One JSON file per catalogue number, so satellites loaded once keep
//! working offline until their epoch ages past the expiration window.

use crate::tle::types::TleData;
use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Serialized cache entry stored as JSON on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTle {
    pub norad: u32,
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub epoch_utc: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
}

impl CachedTle {
    pub fn from_tle(norad: u32, tle: &TleData) -> Self {
        Self {
            norad,
            name: tle.name.clone(),
            line1: tle.line1.clone(),
            line2: tle.line2.clone(),
            epoch_utc: tle.epoch_utc,
            cached_at: Utc::now(),
        }
    }

    pub fn to_tle(&self) -> TleData {
        TleData {
            name: self.name.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            epoch_utc: self.epoch_utc,
        }
    }
}

pub struct TleCache {
    cache_dir: PathBuf,
    expiration_days: i64,
}

impl TleCache {
    /// Cache under the platform cache directory, e.g. `~/.cache/orbitview/tle/` on Linux.
    pub fn new(expiration_days: i64) -> anyhow::Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "orbitview")
            .ok_or_else(|| anyhow::anyhow!("Failed to resolve cache directory"))?;
        Self::new_in_dir(proj_dirs.cache_dir().join("tle"), expiration_days)
    }

    pub fn new_in_dir(cache_dir: PathBuf, expiration_days: i64) -> anyhow::Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            expiration_days,
        })
    }

    /// `Ok(None)` on a cache miss; an unreadable entry is an error.
    pub fn read(&self, norad: u32) -> anyhow::Result<Option<CachedTle>> {
        let path = self.cache_path(norad);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub fn write(&self, entry: &CachedTle) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(entry)?;
        fs::write(self.cache_path(entry.norad), contents)?;
        Ok(())
    }

    /// An entry expires once its epoch is older than the expiration window.
    pub fn is_valid(&self, entry: &CachedTle) -> bool {
        Utc::now().signed_duration_since(entry.epoch_utc) < Duration::days(self.expiration_days)
    }

    fn cache_path(&self, norad: u32) -> PathBuf {
        self.cache_dir.join(format!("{}.json", norad))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) fn unique_temp_dir(test_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "orbitview-{}-{}-{}",
            test_name,
            std::process::id(),
            nanos
        ))
    }

    fn entry(norad: u32, age_days: i64) -> CachedTle {
        CachedTle {
            norad,
            name: Some(format!("SAT {}", norad)),
            line1: format!("1 {:05}U 24001A   26044.51782528  .00000000  00000-0  00000-0 0  9999", norad),
            line2: format!("2 {:05}  51.6416 247.4627 0006703 290.1234  69.8765 15.48919393123456", norad),
            epoch_utc: Utc::now() - Duration::days(age_days),
            cached_at: Utc::now(),
        }
    }

    #[test]
    fn test_cache_write_and_read() {
        let cache = TleCache::new_in_dir(unique_temp_dir("rw"), 7).expect("cache dir");
        let written = entry(99999, 0);
        cache.write(&written).expect("write");

        let cached = cache.read(99999).expect("read").expect("entry present");
        assert_eq!(cached.name.as_deref(), Some("SAT 99999"));
        assert_eq!(cached.line1, written.line1);
        assert_eq!(cached.to_tle().line2, written.line2);
        assert!(cache.is_valid(&cached));
    }

    #[test]
    fn test_cache_expiration_window() {
        let short = TleCache::new_in_dir(unique_temp_dir("short"), 1).expect("cache dir");
        let long = TleCache::new_in_dir(unique_temp_dir("long"), 30).expect("cache dir");
        let old = entry(44444, 2);
        assert!(!short.is_valid(&old));
        assert!(long.is_valid(&old));
    }

    #[test]
    fn test_cache_miss_and_persistence() {
        let dir = unique_temp_dir("persist");
        let cache = TleCache::new_in_dir(dir.clone(), 7).expect("cache dir");
        assert!(cache.read(77777).expect("miss is not an error").is_none());

        cache.write(&entry(55555, 0)).expect("write");
        let reopened = TleCache::new_in_dir(dir, 7).expect("cache dir");
        assert!(reopened.read(55555).expect("read").is_some());
    }

    #[test]
    fn test_cache_corrupt_entry_is_error() {
        let dir = unique_temp_dir("corrupt");
        let cache = TleCache::new_in_dir(dir.clone(), 7).expect("cache dir");
        fs::write(dir.join("12345.json"), "not json").expect("write file");
        assert!(cache.read(12345).is_err());
    }
}
