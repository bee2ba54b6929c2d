use crate::output::Output;
use anisync_config::PathManager;
use color_eyre::Result;
use std::fs;
use std::path::Path;

pub fn run_clear(all: bool, cache: bool, ledger: bool, reference: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    if !(all || cache || ledger || reference) {
        output.warn("No clear option specified. Use --cache, --ledger, --reference, or --all");
        output.println("\nExample: anisync clear --cache");
        return Ok(());
    }

    if all || cache {
        remove_file(&path_manager.identity_cache_file(), "identity cache", output)?;
    }
    if all || ledger {
        remove_file(&path_manager.error_ledger_file(), "error ledger", output)?;
    }
    if all || reference {
        remove_file(&path_manager.anime_list_file(), "anime-list dataset", output)?;
        remove_file(&path_manager.offline_database_file(), "offline database", output)?;
    }
    if all {
        output.success("Identity cache, error ledger and reference data cleared");
    }
    Ok(())
}

fn remove_file(path: &Path, what: &str, output: &Output) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to remove {} at {}: {}", what, path.display(), e))?;
        output.success(format!("Cleared {}: {}", what, path.display()));
    } else {
        output.info(format!("No {} found to clear", what));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tvdb_to_anilist.json");
        std::fs::write(&path, "{}").unwrap();
        let output = Output::new(OutputFormat::Human, true);

        remove_file(&path, "identity cache", &output).unwrap();
        assert!(!path.exists());
        // Absent files are not an error
        remove_file(&path, "identity cache", &output).unwrap();
    }
}
