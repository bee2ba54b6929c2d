use super::config::load_config;
use crate::output::{Output, OutputFormat};
use anisync_config::{Config, CredentialStore, PathManager};
use anisync_core::{SweepOptions, SweepReport, SweepSettings, SyncOrchestrator};
use anisync_sources::{AniListClient, HttpReferenceFetcher, PlexLibrary};
use color_eyre::Result;
use serde_json::json;
use std::time::Duration;

pub async fn run_sync(dry_run: bool, libraries: Vec<String>, output: &Output) -> Result<()> {
    tracing::debug!("Sync command started");

    let config = load_config()?;
    let path_manager = PathManager::default();

    let mut options = SweepOptions::from_config(&config);
    options.dry_run = dry_run;
    if !libraries.is_empty() {
        options.libraries = libraries;
    }

    let mut orchestrator = build_orchestrator(&config, &path_manager, options)?;
    orchestrator
        .authenticate()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let report = orchestrator
        .sync()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Sync failed: {}", e))?;

    print_report(&report, output);
    if report.unresolved + report.rejected > 0 && output.is_human() {
        output.info("Run 'anisync ledger' to see entries that need attention");
    }
    Ok(())
}

/// Wire Plex, AniList and the reference fetcher into an orchestrator
pub fn build_orchestrator(config: &Config, path_manager: &PathManager, options: SweepOptions) -> Result<SyncOrchestrator> {
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create data directories: {}", e))?;

    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

    let plex_token = cred_store
        .plex_token()
        .ok_or_else(|| color_eyre::eyre::eyre!("Plex token not found. Run 'anisync config plex' first"))?;
    let anilist_token = cred_store
        .anilist_access_token()
        .ok_or_else(|| color_eyre::eyre::eyre!("AniList access token not found. Run 'anisync config anilist' first"))?;

    let library = PlexLibrary::new(plex_token, config.plex.server_url.clone());
    let tracker = AniListClient::new(
        anilist_token,
        config.anilist.username.clone(),
        Duration::from_millis(config.anilist.request_delay_ms),
    )?;
    let fetcher = HttpReferenceFetcher::new()?;

    Ok(SyncOrchestrator::new(
        Box::new(library),
        Box::new(tracker),
        Box::new(fetcher),
        SweepSettings::from_config(config, path_manager),
    )
    .with_options(options))
}

pub fn print_report(report: &SweepReport, output: &Output) {
    match output.format() {
        OutputFormat::Human => {
            let prefix = if report.dry_run { "[dry run] " } else { "" };
            output.success(format!(
                "{}Sweep completed in {:.1}s: {} seasons, {} updated, {} up to date, {} unresolved, {} rejected, {} marked completed",
                prefix,
                report.duration.as_secs_f64(),
                report.seasons_seen,
                report.pushed,
                report.up_to_date,
                report.unresolved,
                report.rejected,
                report.completed_fixes
            ));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "success": true,
                "dry_run": report.dry_run,
                "started_at": report.started_at.to_rfc3339(),
                "duration_seconds": report.duration.as_secs_f64(),
                "seasons_seen": report.seasons_seen,
                "pushed": report.pushed,
                "up_to_date": report.up_to_date,
                "unresolved": report.unresolved,
                "rejected": report.rejected,
                "completed_fixes": report.completed_fixes,
                "resolver": report.resolver,
            }));
        }
    }
}
