use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// season number -> tracking id, `None` meaning "resolution failed before"
pub type SeasonMappings = BTreeMap<String, Option<String>>;

/// Result of a cache lookup.
///
/// `Hit(None)` is a remembered failure and must not trigger another dataset
/// scan; only `Miss` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Option<String>),
    Miss,
}

/// In-memory identity cache: local id -> season -> tracking id.
///
/// Serialized as a plain nested JSON object so the file stays readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdCache {
    entries: BTreeMap<String, SeasonMappings>,
    #[serde(skip)]
    dirty: bool,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, local_id: &str, season_number: &str) -> CacheLookup {
        match self.entries.get(local_id).and_then(|seasons| seasons.get(season_number)) {
            Some(tracking_id) => CacheLookup::Hit(tracking_id.clone()),
            None => CacheLookup::Miss,
        }
    }

    /// Record a resolution result, keeping other seasons of the same show.
    ///
    /// Returns `true` if the stored value changed.
    pub fn insert(&mut self, local_id: &str, season_number: &str, tracking_id: Option<String>) -> bool {
        let seasons = self.entries.entry(local_id.to_string()).or_default();
        let previous = seasons.insert(season_number.to_string(), tracking_id.clone());
        let changed = previous.as_ref() != Some(&tracking_id);
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Reverse lookup: the first `(local id, season)` mapped to `tracking_id`
    pub fn find_local(&self, tracking_id: &str) -> Option<(&str, &str)> {
        self.entries.iter().find_map(|(local_id, seasons)| {
            seasons
                .iter()
                .find(|(_, mapped)| mapped.as_deref() == Some(tracking_id))
                .map(|(season, _)| (local_id.as_str(), season.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|seasons| seasons.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn shows(&self) -> usize {
        self.entries.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
