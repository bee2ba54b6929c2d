use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Atomic write: write to temp file, then rename over the target
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

/// Load a JSON document, starting from `T::default()` when the file is
/// missing. A file that no longer parses is moved aside to `*.bak`.
pub fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("{} does not exist, starting empty", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&content) {
        Ok(value) => Ok(value),
        Err(e) => {
            let backup_path = path.with_extension("json.bak");
            if let Err(backup_err) = std::fs::rename(path, &backup_path) {
                warn!(
                    "Failed to back up unreadable file {}: {}. Starting empty.",
                    path.display(),
                    backup_err
                );
            } else {
                info!(
                    "{} could not be parsed (error: {}). Moved it to {:?} and starting empty.",
                    path.display(),
                    e,
                    backup_path
                );
            }
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let mut value = BTreeMap::new();
        value.insert("b".to_string(), 2);
        value.insert("a".to_string(), 1);

        save_json(&path, &value).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded: BTreeMap<String, i32> = load_json_or_default(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded: BTreeMap<String, i32> = load_json_or_default(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let loaded: BTreeMap<String, i32> = load_json_or_default(&path).unwrap();
        assert!(loaded.is_empty());
        assert!(!path.exists());
        assert!(dir.path().join("broken.json.bak").exists());
    }
}
