use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use crate::id_cache::IdCache;
use crate::json_file::{load_json_or_default, save_json};

/// JSON persistence for the identity cache
pub struct IdCacheStorage {
    cache_path: PathBuf,
}

impl IdCacheStorage {
    pub fn new(cache_path: &Path) -> Self {
        Self {
            cache_path: cache_path.to_path_buf(),
        }
    }

    /// Load cache from disk; a missing or unreadable file yields an empty cache
    pub fn load(&self) -> Result<IdCache> {
        let start = Instant::now();
        let cache: IdCache = load_json_or_default(&self.cache_path)?;
        info!(
            "Loaded ID cache: {} shows, {} season mappings in {:?}",
            cache.shows(),
            cache.len(),
            start.elapsed()
        );
        Ok(cache)
    }

    /// Write the whole cache atomically
    pub fn save(&self, cache: &IdCache) -> Result<()> {
        save_json(&self.cache_path, cache)?;
        debug!("Saved ID cache: {} season mappings", cache.len());
        Ok(())
    }

    pub fn cache_exists(&self) -> bool {
        self.cache_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_cache::CacheLookup;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = IdCacheStorage::new(&dir.path().join("tvdb_to_anilist.json"));
        assert!(!storage.cache_exists());

        let mut cache = IdCache::new();
        cache.insert("81797", "1", Some("21".to_string()));
        cache.insert("81797", "2", None);
        storage.save(&cache).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.lookup("81797", "1"), CacheLookup::Hit(Some("21".to_string())));
        assert_eq!(loaded.lookup("81797", "2"), CacheLookup::Hit(None));
    }

    #[test]
    fn test_saving_same_content_is_byte_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tvdb_to_anilist.json");
        let storage = IdCacheStorage::new(&path);

        let mut cache = IdCache::new();
        cache.insert("2", "1", Some("9".to_string()));
        cache.insert("1", "1", Some("8".to_string()));
        storage.save(&cache).unwrap();
        let first = std::fs::read(&path).unwrap();

        cache.insert("1", "1", Some("8".to_string()));
        storage.save(&cache).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }
}
