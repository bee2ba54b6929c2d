//! The two public datasets that bridge library ids to tracking ids.
//!
//! `anime-list-full.xml` maps a TVDB series plus season to an AniDB id;
//! `anime-offline-database.json` groups the URLs every site uses for the
//! same anime, which links an AniDB page to an AniList page.

use anisync_sources::ReferenceFetcher;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};
use crate::error::SweepError;
use crate::json_file::write_atomic;

pub const LEGACY_URL_PREFIX: &str = "https://anidb.net/anime/";
pub const TRACKING_URL_PREFIX: &str = "https://anilist.co/anime/";

/// Where a dataset comes from and where it lives on disk
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub name: &'static str,
    pub url: String,
    pub path: PathBuf,
}

impl DatasetSource {
    pub fn new(name: &'static str, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            url: url.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Refreshed,
}

#[derive(Debug, Deserialize)]
struct AnimeListXml {
    #[serde(rename = "anime", default)]
    anime: Vec<AnimeListRecord>,
}

/// One `<anime>` element of the anime-list dataset
#[derive(Debug, Clone, Deserialize)]
pub struct AnimeListRecord {
    #[serde(rename = "@anidbid")]
    pub legacy_id: String,
    #[serde(rename = "@tvdbid", default)]
    pub local_id: Option<String>,
    /// Usually a number; `a` marks absolute episode numbering
    #[serde(rename = "@defaulttvdbseason", default)]
    pub default_season: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfflineDatabase {
    #[serde(default)]
    data: Vec<OfflineRecord>,
}

/// One anime of the offline database, reduced to its source URLs
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineRecord {
    #[serde(default)]
    pub sources: Vec<String>,
}

impl OfflineRecord {
    pub fn tracking_id(&self) -> Option<&str> {
        self.sources
            .iter()
            .find_map(|url| url.strip_prefix(TRACKING_URL_PREFIX))
            .and_then(|rest| rest.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }
}

/// Both datasets, parsed once per sweep and read by every resolution
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    anime_list: Vec<AnimeListRecord>,
    offline_database: Vec<OfflineRecord>,
}

impl ReferenceData {
    pub fn new(anime_list: Vec<AnimeListRecord>, offline_database: Vec<OfflineRecord>) -> Self {
        Self {
            anime_list,
            offline_database,
        }
    }

    pub fn parse(anime_list_xml: &str, offline_database_json: &str) -> Result<Self> {
        let anime_list: AnimeListXml =
            quick_xml::de::from_str(anime_list_xml).context("anime-list XML could not be parsed")?;
        let offline: OfflineDatabase =
            serde_json::from_str(offline_database_json).context("offline database JSON could not be parsed")?;
        Ok(Self::new(anime_list.anime, offline.data))
    }

    pub fn load(anime_list_path: &Path, offline_database_path: &Path) -> Result<Self> {
        let start = Instant::now();
        let xml = std::fs::read_to_string(anime_list_path)
            .with_context(|| format!("Failed to read {}", anime_list_path.display()))?;
        let json = std::fs::read_to_string(offline_database_path)
            .with_context(|| format!("Failed to read {}", offline_database_path.display()))?;
        let data = Self::parse(&xml, &json)?;
        info!(
            "Loaded reference data: {} anime-list records, {} offline database records in {:?}",
            data.anime_list.len(),
            data.offline_database.len(),
            start.elapsed()
        );
        Ok(data)
    }

    /// First anime-list record whose series and default season both match
    /// exactly
    pub fn find_legacy_id(&self, local_id: &str, season_number: &str) -> Option<&str> {
        self.anime_list
            .iter()
            .find(|record| {
                record.local_id.as_deref() == Some(local_id)
                    && record.default_season.as_deref() == Some(season_number)
            })
            .map(|record| record.legacy_id.as_str())
    }

    /// Tracking id of the first offline record listing the AniDB page
    pub fn find_tracking_id(&self, legacy_id: &str) -> Option<&str> {
        let legacy_url = format!("{}{}", LEGACY_URL_PREFIX, legacy_id);
        self.offline_database
            .iter()
            .find(|record| record.sources.iter().any(|url| *url == legacy_url))
            .and_then(|record| record.tracking_id())
    }
}

/// Keeps the local copies of the datasets no older than `max_age`
pub struct ReferenceDataStore<'a> {
    fetcher: &'a dyn ReferenceFetcher,
    max_age: Duration,
}

impl<'a> ReferenceDataStore<'a> {
    pub fn new(fetcher: &'a dyn ReferenceFetcher, max_age: Duration) -> Self {
        Self { fetcher, max_age }
    }

    /// Re-download the dataset if it is missing or at least `max_age` old.
    ///
    /// The replacement is written beside the old file and renamed over it,
    /// so a failed download leaves the previous copy in place.
    pub async fn ensure_fresh(&self, source: &DatasetSource) -> Result<Freshness, SweepError> {
        match file_age(&source.path) {
            Some(age) if age < self.max_age => {
                debug!("{} is {}s old, keeping it", source.name, age.as_secs());
                return Ok(Freshness::Fresh);
            }
            Some(age) => info!(
                operation = "reference_refresh",
                dataset = source.name,
                age_secs = age.as_secs(),
                "Reference data {} is stale, downloading a new copy",
                source.name
            ),
            None => info!(
                operation = "reference_refresh",
                dataset = source.name,
                "Reference data {} not found, downloading",
                source.name
            ),
        }

        let bytes = self.fetcher.fetch(&source.url).await.map_err(|e| {
            SweepError::ReferenceData(anyhow::Error::new(e).context(format!("Failed to download {}", source.name)))
        })?;
        write_atomic(&source.path, &bytes).map_err(SweepError::ReferenceData)?;
        info!("Stored {} ({} bytes)", source.name, bytes.len());
        Ok(Freshness::Refreshed)
    }

    /// Refresh both datasets as needed and parse them
    pub async fn load(
        &self,
        anime_list: &DatasetSource,
        offline_database: &DatasetSource,
    ) -> Result<ReferenceData, SweepError> {
        self.ensure_fresh(anime_list).await?;
        self.ensure_fresh(offline_database).await?;
        ReferenceData::load(&anime_list.path, &offline_database.path).map_err(SweepError::ReferenceData)
    }
}

/// `None` if the file is absent or its timestamp cannot be read
fn file_age(path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    match SystemTime::now().duration_since(modified) {
        Ok(age) => Some(age),
        Err(_) => {
            warn!("{} has a modification time in the future", path.display());
            Some(Duration::ZERO)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anisync_sources::SourceError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const ANIME_LIST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<anime-list>
  <anime anidbid="23" tvdbid="76885" defaulttvdbseason="1" episodeoffset="" tmdbid="" imdbid="">
    <name>Cowboy Bebop</name>
    <mapping-list>
      <mapping anidbseason="0" tvdbseason="0">;1-2;</mapping>
    </mapping-list>
  </anime>
  <anime anidbid="4563" tvdbid="79481" defaulttvdbseason="1">
    <name>Death Note</name>
  </anime>
  <anime anidbid="9541" tvdbid="267440" defaulttvdbseason="2">
    <name>Shingeki no Kyojin (2017)</name>
  </anime>
  <anime anidbid="5" tvdbid="movie" imdbid="tt0">
    <name>Some Movie</name>
  </anime>
  <anime anidbid="6" tvdbid="79481" defaulttvdbseason="a">
    <name>Absolute</name>
  </anime>
</anime-list>
"#;

    const OFFLINE_DATABASE_JSON: &str = r#"{"license":{"name":"ODbL"},"data":[
        {"sources":["https://anidb.net/anime/23","https://anilist.co/anime/1","https://myanimelist.net/anime/1"],"title":"Cowboy Bebop"},
        {"sources":["https://anidb.net/anime/4563","https://kitsu.app/anime/1376"],"title":"Death Note"},
        {"sources":["https://anidb.net/anime/9541","https://anilist.co/anime/20958"],"title":"Attack on Titan Season 2"}
    ]}"#;

    struct CountingFetcher {
        calls: Mutex<Vec<String>>,
        body: Result<Vec<u8>, ()>,
    }

    #[async_trait]
    impl ReferenceFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.body
                .clone()
                .map_err(|_| SourceError::unreachable("reference", "connection refused"))
        }
    }

    fn fetcher(body: &str) -> CountingFetcher {
        CountingFetcher {
            calls: Mutex::new(Vec::new()),
            body: Ok(body.as_bytes().to_vec()),
        }
    }

    fn set_age(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_find_legacy_id_exact_match() {
        let data = ReferenceData::parse(ANIME_LIST_XML, OFFLINE_DATABASE_JSON).unwrap();
        assert_eq!(data.find_legacy_id("76885", "1"), Some("23"));
        assert_eq!(data.find_legacy_id("267440", "2"), Some("9541"));
        assert_eq!(data.find_legacy_id("267440", "1"), None);
        assert_eq!(data.find_legacy_id("79481", "a"), Some("6"));
        assert_eq!(data.find_legacy_id("nope", "1"), None);
    }

    #[test]
    fn test_find_tracking_id() {
        let data = ReferenceData::parse(ANIME_LIST_XML, OFFLINE_DATABASE_JSON).unwrap();
        assert_eq!(data.find_tracking_id("23"), Some("1"));
        assert_eq!(data.find_tracking_id("9541"), Some("20958"));
        // Listed, but no AniList page
        assert_eq!(data.find_tracking_id("4563"), None);
        // Prefix of another id must not match
        assert_eq!(data.find_tracking_id("95"), None);
    }

    #[test]
    fn test_malformed_datasets_fail() {
        assert!(ReferenceData::parse("<anime-list><anime", OFFLINE_DATABASE_JSON).is_err());
        assert!(ReferenceData::parse(ANIME_LIST_XML, "{\"data\": [").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_downloaded() {
        let dir = TempDir::new().unwrap();
        let source = DatasetSource::new("anime-list", "https://example.org/list.xml", dir.path().join("list.xml"));
        let fetcher = fetcher(ANIME_LIST_XML);
        let store = ReferenceDataStore::new(&fetcher, Duration::from_secs(604_800));

        assert_eq!(store.ensure_fresh(&source).await.unwrap(), Freshness::Refreshed);
        assert_eq!(std::fs::read_to_string(&source.path).unwrap(), ANIME_LIST_XML);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_file_is_not_fetched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.xml");
        std::fs::write(&path, "old").unwrap();
        set_age(&path, Duration::from_secs(3600));

        let source = DatasetSource::new("anime-list", "https://example.org/list.xml", &path);
        let fetcher = fetcher("new");
        let store = ReferenceDataStore::new(&fetcher, Duration::from_secs(604_800));

        assert_eq!(store.ensure_fresh(&source).await.unwrap(), Freshness::Fresh);
        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[tokio::test]
    async fn test_stale_file_is_replaced_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.xml");
        std::fs::write(&path, "old").unwrap();
        set_age(&path, Duration::from_secs(604_800 + 60));

        let source = DatasetSource::new("anime-list", "https://example.org/list.xml", &path);
        let fetcher = fetcher("new");
        let store = ReferenceDataStore::new(&fetcher, Duration::from_secs(604_800));

        assert_eq!(store.ensure_fresh(&source).await.unwrap(), Freshness::Refreshed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        // The new copy is fresh
        assert_eq!(store.ensure_fresh(&source).await.unwrap(), Freshness::Fresh);
        assert_eq!(*fetcher.calls.lock().unwrap(), vec!["https://example.org/list.xml".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_download_keeps_old_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.xml");
        std::fs::write(&path, "old").unwrap();
        set_age(&path, Duration::from_secs(700_000));

        let source = DatasetSource::new("anime-list", "https://example.org/list.xml", &path);
        let fetcher = CountingFetcher {
            calls: Mutex::new(Vec::new()),
            body: Err(()),
        };
        let store = ReferenceDataStore::new(&fetcher, Duration::from_secs(604_800));

        let err = store.ensure_fresh(&source).await.unwrap_err();
        assert!(matches!(err, SweepError::ReferenceData(_)));
        assert!(err.is_fatal());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }
}
