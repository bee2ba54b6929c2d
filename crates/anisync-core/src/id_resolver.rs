use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};
use crate::id_cache::{CacheLookup, IdCache};
use crate::id_cache_storage::IdCacheStorage;
use crate::reference::ReferenceData;

/// Counters for one sweep's worth of resolutions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub cache_hits: usize,
    pub dataset_scans: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

/// Maps `(local id, season)` to a tracking id.
///
/// This service combines:
/// - In-memory cache (IdCache), consulted first
/// - Persistent storage (IdCacheStorage), written after every new answer
/// - The reference datasets, scanned only on a cache miss
pub struct IdResolver {
    cache: IdCache,
    storage: IdCacheStorage,
    stats: ResolverStats,
}

impl IdResolver {
    pub fn new(cache_path: &Path) -> Result<Self> {
        let storage = IdCacheStorage::new(cache_path);
        let cache = if storage.cache_exists() {
            storage.load()?
        } else {
            IdCache::new()
        };
        Ok(Self {
            cache,
            storage,
            stats: ResolverStats::default(),
        })
    }

    /// Resolve a season, remembering both successes and failures.
    ///
    /// A remembered failure returns `None` without scanning the datasets
    /// again. A fresh answer is persisted before this returns.
    pub fn resolve(
        &mut self,
        reference: &ReferenceData,
        local_id: &str,
        title: &str,
        season_number: &str,
    ) -> Result<Option<String>> {
        if let CacheLookup::Hit(tracking_id) = self.cache.lookup(local_id, season_number) {
            self.stats.cache_hits += 1;
            debug!(local_id, season = season_number, ?tracking_id, "ID resolver: cache hit for '{}'", title);
            self.count(&tracking_id);
            return Ok(tracking_id);
        }

        self.stats.dataset_scans += 1;
        let tracking_id = match reference.find_legacy_id(local_id, season_number) {
            Some(legacy_id) => {
                let tracking_id = reference.find_tracking_id(legacy_id).map(str::to_string);
                if tracking_id.is_none() {
                    debug!("ID resolver: AniDB {} for '{}' has no AniList counterpart", legacy_id, title);
                }
                tracking_id
            }
            None => {
                debug!(
                    "ID resolver: '{}' ({}) season {} not in anime-list",
                    title, local_id, season_number
                );
                None
            }
        };

        info!(
            operation = "id_resolution",
            local_id,
            season = season_number,
            ?tracking_id,
            "Resolved '{}' season {} -> {:?}",
            title,
            season_number,
            tracking_id
        );
        self.store(local_id, season_number, tracking_id.clone())?;
        self.count(&tracking_id);
        Ok(tracking_id)
    }

    /// Record a mapping and persist the whole cache
    pub fn store(&mut self, local_id: &str, season_number: &str, tracking_id: Option<String>) -> Result<()> {
        self.cache.insert(local_id, season_number, tracking_id);
        if self.cache.is_dirty() {
            self.storage.save(&self.cache)?;
            self.cache.mark_clean();
        }
        Ok(())
    }

    pub fn cache(&self) -> &IdCache {
        &self.cache
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    fn count(&mut self, tracking_id: &Option<String>) {
        if tracking_id.is_some() {
            self.stats.resolved += 1;
        } else {
            self.stats.unresolved += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{AnimeListRecord, OfflineRecord};
    use tempfile::TempDir;

    fn reference() -> ReferenceData {
        ReferenceData::new(
            vec![
                AnimeListRecord {
                    legacy_id: "23".to_string(),
                    local_id: Some("76885".to_string()),
                    default_season: Some("1".to_string()),
                },
                AnimeListRecord {
                    legacy_id: "4563".to_string(),
                    local_id: Some("79481".to_string()),
                    default_season: Some("1".to_string()),
                },
            ],
            vec![
                OfflineRecord {
                    sources: vec![
                        "https://anidb.net/anime/23".to_string(),
                        "https://anilist.co/anime/1".to_string(),
                    ],
                },
                OfflineRecord {
                    sources: vec!["https://anidb.net/anime/4563".to_string()],
                },
            ],
        )
    }

    #[test]
    fn test_resolves_through_both_datasets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tvdb_to_anilist.json");
        let mut resolver = IdResolver::new(&path).unwrap();

        let id = resolver.resolve(&reference(), "76885", "Cowboy Bebop", "1").unwrap();
        assert_eq!(id.as_deref(), Some("1"));
        assert!(path.exists());

        let reloaded = IdResolver::new(&path).unwrap();
        assert_eq!(reloaded.cache().lookup("76885", "1"), CacheLookup::Hit(Some("1".to_string())));
    }

    #[test]
    fn test_failures_are_remembered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tvdb_to_anilist.json");
        let mut resolver = IdResolver::new(&path).unwrap();

        // In anime-list, but not on AniList
        assert_eq!(resolver.resolve(&reference(), "79481", "Death Note", "1").unwrap(), None);
        // Not in anime-list at all
        assert_eq!(resolver.resolve(&reference(), "1", "Unknown", "3").unwrap(), None);
        assert_eq!(resolver.stats().dataset_scans, 2);

        // Second time around the cache answers, even with no datasets
        let empty = ReferenceData::default();
        assert_eq!(resolver.resolve(&empty, "79481", "Death Note", "1").unwrap(), None);
        let stats = resolver.stats();
        assert_eq!(stats.dataset_scans, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.unresolved, 3);
        assert_eq!(stats.resolved, 0);
    }

    #[test]
    fn test_cache_hit_skips_datasets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tvdb_to_anilist.json");
        std::fs::write(&path, r#"{"76885":{"1":"999"}}"#).unwrap();
        let mut resolver = IdResolver::new(&path).unwrap();

        let id = resolver.resolve(&reference(), "76885", "Cowboy Bebop", "1").unwrap();
        assert_eq!(id.as_deref(), Some("999"));
        assert_eq!(resolver.stats().dataset_scans, 0);
    }

    #[test]
    fn test_repeated_store_leaves_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tvdb_to_anilist.json");
        let mut resolver = IdResolver::new(&path).unwrap();

        resolver.store("76885", "1", Some("1".to_string())).unwrap();
        let first = std::fs::read(&path).unwrap();
        resolver.store("76885", "1", Some("1".to_string())).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }
}
