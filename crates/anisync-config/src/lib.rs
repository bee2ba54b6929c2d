pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{AniListConfig, Config, LedgerConfig, LedgerRetention, PlexConfig, ReferenceConfig, SchedulerConfig, default_scheduler_config, validate_schedule};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
