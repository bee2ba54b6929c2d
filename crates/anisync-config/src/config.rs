use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ANIME_LIST_URL: &str =
    "https://raw.githubusercontent.com/Anime-Lists/anime-lists/master/anime-list-full.xml";
pub const DEFAULT_OFFLINE_DATABASE_URL: &str =
    "https://raw.githubusercontent.com/manami-project/anime-offline-database/master/anime-offline-database.json";

/// Seven days. Older reference files are replaced before use.
pub const DEFAULT_REFERENCE_MAX_AGE_SECS: u64 = 604_800;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub plex: PlexConfig,
    #[serde(default)]
    pub anilist: AniListConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlexConfig {
    pub server_url: String,
    /// Libraries are swept one after another in this order
    pub libraries: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AniListConfig {
    /// Defaults to the name of the account the access token belongs to
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            username: None,
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReferenceConfig {
    #[serde(default = "default_anime_list_url")]
    pub anime_list_url: String,
    #[serde(default = "default_offline_database_url")]
    pub offline_database_url: String,
    #[serde(default = "default_reference_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            anime_list_url: default_anime_list_url(),
            offline_database_url: default_offline_database_url(),
            max_age_secs: default_reference_max_age_secs(),
        }
    }
}

/// What happens to the error ledger when a new sweep starts
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRetention {
    /// The ledger only ever reflects the most recent sweep
    #[default]
    ClearEachSweep,
    /// Entries pile up until removed by hand
    Accumulate,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub retention: LedgerRetention,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Six-field cron expression (seconds first)
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 0 3 * * *".to_string() // Daily at 03:00
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_anime_list_url() -> String {
    DEFAULT_ANIME_LIST_URL.to_string()
}

fn default_offline_database_url() -> String {
    DEFAULT_OFFLINE_DATABASE_URL.to_string()
}

fn default_reference_max_age_secs() -> u64 {
    DEFAULT_REFERENCE_MAX_AGE_SECS
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.plex.server_url.trim().is_empty() {
            return Err(anyhow::anyhow!("plex.server_url is required and cannot be empty"));
        }

        if self.plex.libraries.is_empty() {
            return Err(anyhow::anyhow!("plex.libraries must name at least one library"));
        }
        if self.plex.libraries.iter().any(|l| l.trim().is_empty()) {
            return Err(anyhow::anyhow!("plex.libraries contains an empty library name"));
        }

        if self.reference.max_age_secs == 0 {
            return Err(anyhow::anyhow!("reference.max_age_secs must be greater than zero"));
        }

        for (name, url) in [
            ("anime_list_url", &self.reference.anime_list_url),
            ("offline_database_url", &self.reference.offline_database_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!("reference.{} must be an http(s) URL: {}", name, url));
            }
        }

        if let Some(ref scheduler) = self.scheduler {
            validate_schedule(&scheduler.schedule)?;
        }

        Ok(())
    }

    /// Scheduler settings, falling back to defaults when the section is absent
    pub fn scheduler_or_default(&self) -> SchedulerConfig {
        self.scheduler.clone().unwrap_or_else(default_scheduler_config)
    }
}

/// The scheduler expects `sec min hour day-of-month month day-of-week`
pub fn validate_schedule(schedule: &str) -> anyhow::Result<()> {
    let fields = schedule.split_whitespace().count();
    if fields != 6 && fields != 7 {
        return Err(anyhow::anyhow!(
            "Schedule '{}' must be a cron expression with 6 fields (sec min hour dom month dow), found {}",
            schedule,
            fields
        ));
    }
    Ok(())
}
