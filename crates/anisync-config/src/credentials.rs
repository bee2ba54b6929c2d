use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const PLEX_TOKEN_ENV: &str = "ANISYNC_PLEX_TOKEN";
const ANILIST_TOKEN_ENV: &str = "ANISYNC_ANILIST_TOKEN";

/// Contents of `credentials.toml`
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plex_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anilist_access_token: Option<String>,
}

/// Secrets kept apart from `config.toml`
pub struct CredentialStore {
    path: PathBuf,
    credentials: Credentials,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: Credentials::default(),
        }
    }

    /// A missing file leaves the store empty
    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            self.credentials = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.credentials)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn plex_token(&self) -> Option<String> {
        env_or_stored(PLEX_TOKEN_ENV, &self.credentials.plex_token)
    }

    pub fn set_plex_token(&mut self, token: String) {
        self.credentials.plex_token = Some(token);
    }

    pub fn anilist_access_token(&self) -> Option<String> {
        env_or_stored(ANILIST_TOKEN_ENV, &self.credentials.anilist_access_token)
    }

    pub fn set_anilist_access_token(&mut self, token: String) {
        self.credentials.anilist_access_token = Some(token);
    }
}

/// Environment variable wins over the stored value; blanks count as unset
fn env_or_stored(env_var: &str, stored: &Option<String>) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| stored.clone().filter(|v| !v.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_credential_store_load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");

        let mut store = CredentialStore::new(path.clone());
        store.set_plex_token("plex_secret".to_string());
        store.set_anilist_access_token("anilist_secret".to_string());
        store.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("plex_token = \"plex_secret\""));

        let mut loaded = CredentialStore::new(path);
        loaded.load().unwrap();
        assert_eq!(loaded.credentials.plex_token.as_deref(), Some("plex_secret"));
        assert_eq!(loaded.credentials.anilist_access_token.as_deref(), Some("anilist_secret"));
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let mut store = CredentialStore::new(PathBuf::from("/nonexistent/anisync/credentials.toml"));
        store.load().unwrap();
        assert_eq!(store.credentials, Credentials::default());
    }

    #[test]
    fn test_unset_token_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        let mut store = CredentialStore::new(path.clone());
        store.set_plex_token("plex_secret".to_string());
        store.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("anilist_access_token"));
    }

    #[test]
    fn test_blank_stored_value_counts_as_unset() {
        assert_eq!(env_or_stored("ANISYNC_TEST_UNSET_VARIABLE", &Some("  ".to_string())), None);
        assert_eq!(
            env_or_stored("ANISYNC_TEST_UNSET_VARIABLE", &Some("token".to_string())),
            Some("token".to_string())
        );
    }
}
