use anisync_config::LedgerRetention;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use crate::json_file::{load_json_or_default, save_json};

/// Season recorded for failures that concern a whole remote entry
pub const WHOLE_ENTRY_SEASON: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub title: String,
    pub seasons: Vec<String>,
}

/// Shows whose mapping or update failed, keyed by local id.
///
/// A season is listed at most once per show, in first-seen order. Every
/// change rewrites the whole file.
#[derive(Debug)]
pub struct ErrorLedger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl ErrorLedger {
    /// Open the ledger for a new sweep, clearing it first unless entries
    /// are kept across sweeps
    pub fn open(path: &Path, retention: LedgerRetention) -> Result<Self> {
        match retention {
            LedgerRetention::ClearEachSweep => {
                let ledger = Self {
                    path: path.to_path_buf(),
                    entries: BTreeMap::new(),
                };
                ledger.save()?;
                info!(operation = "ledger_reset", "Cleared error ledger for new sweep");
                Ok(ledger)
            }
            LedgerRetention::Accumulate => Self::load(path),
        }
    }

    /// Read the ledger as it is on disk
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            entries: load_json_or_default(path)?,
        })
    }

    /// Add a failed season. Returns `false` if it was already recorded.
    pub fn record(&mut self, local_id: &str, title: &str, season_number: &str) -> Result<bool> {
        let entry = self.entries.entry(local_id.to_string()).or_insert_with(|| LedgerEntry {
            title: title.to_string(),
            seasons: Vec::new(),
        });
        if entry.seasons.iter().any(|s| s == season_number) {
            return Ok(false);
        }
        entry.seasons.push(season_number.to_string());

        warn!(
            operation = "ledger_record",
            local_id,
            season = season_number,
            "Recorded error for '{}' season {}",
            title,
            season_number
        );
        self.save()?;
        Ok(true)
    }

    pub fn entries(&self) -> &BTreeMap<String, LedgerEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        save_json(&self.path, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_dedups_seasons() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping_errors.json");
        let mut ledger = ErrorLedger::open(&path, LedgerRetention::ClearEachSweep).unwrap();

        assert!(ledger.record("81797", "One Piece", "2").unwrap());
        assert!(ledger.record("81797", "One Piece", "1").unwrap());
        assert!(!ledger.record("81797", "One Piece", "2").unwrap());

        let reloaded = ErrorLedger::load(&path).unwrap();
        assert_eq!(
            reloaded.entries()["81797"],
            LedgerEntry {
                title: "One Piece".to_string(),
                seasons: vec!["2".to_string(), "1".to_string()],
            }
        );
    }

    #[test]
    fn test_open_clears_by_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping_errors.json");
        let mut ledger = ErrorLedger::open(&path, LedgerRetention::ClearEachSweep).unwrap();
        ledger.record("1", "A", "1").unwrap();

        let ledger = ErrorLedger::open(&path, LedgerRetention::ClearEachSweep).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[test]
    fn test_open_can_accumulate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping_errors.json");
        let mut ledger = ErrorLedger::open(&path, LedgerRetention::Accumulate).unwrap();
        ledger.record("1", "A", "1").unwrap();

        let mut ledger = ErrorLedger::open(&path, LedgerRetention::Accumulate).unwrap();
        assert_eq!(ledger.len(), 1);
        ledger.record("2", "B", WHOLE_ENTRY_SEASON).unwrap();
        assert_eq!(ErrorLedger::load(&path).unwrap().len(), 2);
    }
}
