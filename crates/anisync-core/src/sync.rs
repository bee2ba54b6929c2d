use anisync_config::{Config, LedgerRetention, PathManager};
use anisync_models::{LibrarySeason, RemoteListing, WatchStatus};
use anisync_sources::{LibrarySource, PushOutcome, ReferenceFetcher, TrackingService};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use crate::decision::{decide, SkipReason, UpdateDecision};
use crate::error::SweepError;
use crate::error_ledger::{ErrorLedger, WHOLE_ENTRY_SEASON};
use crate::id_resolver::{IdResolver, ResolverStats};
use crate::reference::{DatasetSource, ReferenceData, ReferenceDataStore};
use crate::show_state::ShowState;

/// Prefix for ledger keys of remote entries with no local counterpart
pub const REMOTE_ONLY_KEY_PREFIX: &str = "anilist:";

/// File locations and refresh policy for one deployment
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub anime_list: DatasetSource,
    pub offline_database: DatasetSource,
    pub reference_max_age: Duration,
    pub identity_cache_path: PathBuf,
    pub error_ledger_path: PathBuf,
}

impl SweepSettings {
    pub fn from_config(config: &Config, paths: &PathManager) -> Self {
        Self {
            anime_list: DatasetSource::new(
                "anime-list-full.xml",
                config.reference.anime_list_url.clone(),
                paths.anime_list_file(),
            ),
            offline_database: DatasetSource::new(
                "anime-offline-database.json",
                config.reference.offline_database_url.clone(),
                paths.offline_database_file(),
            ),
            reference_max_age: Duration::from_secs(config.reference.max_age_secs),
            identity_cache_path: paths.identity_cache_file(),
            error_ledger_path: paths.error_ledger_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepOptions {
    /// Swept one after another, in order
    pub libraries: Vec<String>,
    /// Resolve and decide, but never write to the tracker
    pub dry_run: bool,
    pub ledger_retention: LedgerRetention,
}

impl SweepOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            libraries: config.plex.libraries.clone(),
            dry_run: false,
            ledger_retention: config.ledger.retention,
        }
    }
}

/// Outcome of one sweep. In a dry run `pushed` and `completed_fixes` count
/// the writes that would have been made.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub seasons_seen: usize,
    pub pushed: usize,
    pub up_to_date: usize,
    pub unresolved: usize,
    pub rejected: usize,
    pub completed_fixes: usize,
    pub dry_run: bool,
    pub resolver: ResolverStats,
}

impl SweepReport {
    fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::ZERO,
            seasons_seen: 0,
            pushed: 0,
            up_to_date: 0,
            unresolved: 0,
            rejected: 0,
            completed_fixes: 0,
            dry_run,
            resolver: ResolverStats::default(),
        }
    }
}

/// State owned by one sweep and dropped when it ends
struct SweepContext {
    reference: ReferenceData,
    resolver: IdResolver,
    ledger: ErrorLedger,
}

pub struct SyncOrchestrator {
    library: Box<dyn LibrarySource>,
    tracker: Box<dyn TrackingService>,
    fetcher: Box<dyn ReferenceFetcher>,
    settings: SweepSettings,
    options: SweepOptions,
    authenticated: bool,
}

impl SyncOrchestrator {
    pub fn new(
        library: Box<dyn LibrarySource>,
        tracker: Box<dyn TrackingService>,
        fetcher: Box<dyn ReferenceFetcher>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            library,
            tracker,
            fetcher,
            settings,
            options: SweepOptions::default(),
            authenticated: false,
        }
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    /// Authenticate both ends.
    ///
    /// Rejected credentials come back as `SweepError::AuthInvalid`; a
    /// service that cannot be reached is `SweepError::Remote` and may be
    /// retried.
    pub async fn authenticate(&mut self) -> Result<(), SweepError> {
        self.library.authenticate().await?;
        self.tracker.authenticate().await?;
        self.authenticated = true;
        info!(
            operation = "auth",
            library = self.library.source_name(),
            tracker = self.tracker.service_name(),
            status = "success",
            "Authenticated"
        );
        Ok(())
    }

    /// Authenticate unless an earlier call already succeeded
    pub async fn ensure_authenticated(&mut self) -> Result<(), SweepError> {
        if self.authenticated {
            return Ok(());
        }
        self.authenticate().await
    }

    /// One full pass: refresh reference data, reconcile every library season,
    /// then close out remote entries that are fully watched but not completed.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SweepReport, SweepError> {
        let start = Instant::now();
        let mut report = SweepReport::new(self.options.dry_run);

        info!(
            operation = "sync_start",
            libraries = ?self.options.libraries,
            dry_run = self.options.dry_run,
            "Starting sweep"
        );

        let mut ctx = self.open_context().await?;

        let listing = self.tracker.get_user_entries().await?;
        info!("{}: {} entries on the user's list", self.tracker.service_name(), listing.len());

        for library in &self.options.libraries {
            let seasons = self.library.enumerate(library).await?;
            info!(
                operation = "library_enumerate",
                library = library.as_str(),
                seasons = seasons.len(),
                "Enumerated library '{}'",
                library
            );
            for season in seasons {
                self.reconcile_season(&mut ctx, &listing, season, &mut report).await?;
            }
        }

        self.completion_sweep(&mut ctx, &mut report).await?;

        report.resolver = ctx.resolver.stats();
        report.duration = start.elapsed();
        info!(
            operation = "sync_complete",
            seasons = report.seasons_seen,
            pushed = report.pushed,
            up_to_date = report.up_to_date,
            unresolved = report.unresolved,
            rejected = report.rejected,
            completed_fixes = report.completed_fixes,
            cache_hits = report.resolver.cache_hits,
            dataset_scans = report.resolver.dataset_scans,
            duration_ms = report.duration.as_millis() as u64,
            "Sweep finished"
        );
        Ok(report)
    }

    async fn open_context(&self) -> Result<SweepContext, SweepError> {
        let store = ReferenceDataStore::new(self.fetcher.as_ref(), self.settings.reference_max_age);
        let reference = store
            .load(&self.settings.anime_list, &self.settings.offline_database)
            .await?;
        let resolver = IdResolver::new(&self.settings.identity_cache_path).map_err(SweepError::Storage)?;
        let ledger = ErrorLedger::open(&self.settings.error_ledger_path, self.options.ledger_retention)
            .map_err(SweepError::Storage)?;
        Ok(SweepContext {
            reference,
            resolver,
            ledger,
        })
    }

    async fn reconcile_season(
        &self,
        ctx: &mut SweepContext,
        listing: &RemoteListing,
        season: LibrarySeason,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        report.seasons_seen += 1;

        let tracking_id = ctx
            .resolver
            .resolve(&ctx.reference, &season.local_id, &season.title, &season.season_number)
            .map_err(SweepError::Storage)?;
        if tracking_id.is_none() {
            report.unresolved += 1;
            ctx.ledger
                .record(&season.local_id, &season.title, &season.season_number)
                .map_err(SweepError::Storage)?;
        }

        let remote = tracking_id.as_deref().and_then(|id| listing.get(id));
        let state = ShowState::new(season, tracking_id, remote);

        let tracking_id = match (decide(&state), state.tracking_id.as_deref()) {
            (UpdateDecision::Push, Some(tracking_id)) => tracking_id,
            (UpdateDecision::NoOp(SkipReason::Unresolved), _) | (UpdateDecision::Push, None) => return Ok(()),
            (UpdateDecision::NoOp(reason), _) => {
                debug!("Skipping '{}' season {}: {}", state.title, state.season_number, reason);
                report.up_to_date += 1;
                return Ok(());
            }
        };

        if self.options.dry_run {
            info!(
                "[dry run] Would update '{}' season {} ({}) to {} episodes, {}",
                state.title, state.season_number, tracking_id, state.watched_episodes, state.status
            );
            report.pushed += 1;
            return Ok(());
        }

        match self
            .tracker
            .push_update(tracking_id, state.watched_episodes, state.status)
            .await?
        {
            PushOutcome::Applied => report.pushed += 1,
            PushOutcome::Rejected { reason } => {
                warn!(
                    operation = "remote_push",
                    status = "rejected",
                    tracking_id,
                    "Update for '{}' season {} was rejected: {}",
                    state.title,
                    state.season_number,
                    reason
                );
                report.rejected += 1;
                ctx.ledger
                    .record(&state.local_id, &state.title, &state.season_number)
                    .map_err(SweepError::Storage)?;
            }
        }
        Ok(())
    }

    /// Mark every remote entry whose progress reached its episode count as
    /// completed, whether or not it exists locally
    async fn completion_sweep(&self, ctx: &mut SweepContext, report: &mut SweepReport) -> Result<(), SweepError> {
        let listing = self.tracker.get_user_entries().await?;
        let pending: Vec<_> = listing
            .iter()
            .filter(|(_, entry)| entry.is_completion_pending())
            .collect();
        info!(
            operation = "completion_sweep",
            candidates = pending.len(),
            "Checking {} fully watched entries not marked completed",
            pending.len()
        );

        for (tracking_id, entry) in pending {
            let progress = entry.progress.unwrap_or_default();
            let title = entry
                .title
                .clone()
                .unwrap_or_else(|| format!("AniList {}", tracking_id));

            if self.options.dry_run {
                info!("[dry run] Would mark '{}' ({}) as completed", title, tracking_id);
                report.completed_fixes += 1;
                continue;
            }

            match self
                .tracker
                .push_update(tracking_id, progress, WatchStatus::Completed)
                .await?
            {
                PushOutcome::Applied => report.completed_fixes += 1,
                PushOutcome::Rejected { reason } => {
                    warn!(
                        operation = "completion_sweep",
                        status = "rejected",
                        tracking_id = tracking_id.as_str(),
                        "Marking '{}' completed was rejected: {}",
                        title,
                        reason
                    );
                    report.rejected += 1;
                    let (local_id, season) = match ctx.resolver.cache().find_local(tracking_id) {
                        Some((local_id, season)) => (local_id.to_string(), season.to_string()),
                        None => (
                            format!("{}{}", REMOTE_ONLY_KEY_PREFIX, tracking_id),
                            WHOLE_ENTRY_SEASON.to_string(),
                        ),
                    };
                    ctx.ledger
                        .record(&local_id, &title, &season)
                        .map_err(SweepError::Storage)?;
                }
            }
        }
        Ok(())
    }
}
