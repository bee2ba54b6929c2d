use super::config::load_config;
use super::sync::build_orchestrator;
use crate::output::Output;
use anisync_config::{validate_schedule, PathManager, SchedulerConfig};
use anisync_core::{SweepError, SweepOptions, SyncOrchestrator};
use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Runs sweeps on a cron schedule until a fatal error occurs.
///
/// Sweeps never overlap: the orchestrator sits behind a mutex and a tick
/// that fires while a sweep is running waits for it to finish.
pub struct Scheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<Mutex<SyncOrchestrator>>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(orchestrator: SyncOrchestrator, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            config,
        })
    }

    /// Returns only when a sweep fails fatally
    pub async fn run(mut self) -> Result<()> {
        if self.config.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial sync on startup");
            if let Err(e) = run_sweep(&self.orchestrator).await {
                return Err(color_eyre::eyre::eyre!("Fatal error, stopping daemon: {}", e));
            }
        }

        let (fatal_tx, mut fatal_rx) = mpsc::channel::<SweepError>(1);
        let orchestrator = self.orchestrator.clone();
        let job = Job::new_async(self.config.schedule.as_str(), move |_uuid, _lock| {
            let orchestrator = orchestrator.clone();
            let fatal_tx = fatal_tx.clone();
            Box::pin(async move {
                info!(operation = "scheduled_sync_start", "Starting scheduled sync");
                if let Err(e) = run_sweep(&orchestrator).await {
                    let _ = fatal_tx.send(e).await;
                }
            })
        })
        .map_err(|e| color_eyre::eyre::eyre!("Invalid schedule '{}': {}", self.config.schedule, e))?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        info!(
            operation = "scheduler_started",
            schedule = self.config.schedule.as_str(),
            "Scheduler started"
        );

        let result = match fatal_rx.recv().await {
            Some(e) => Err(color_eyre::eyre::eyre!("Fatal error, stopping daemon: {}", e)),
            None => Ok(()),
        };
        if let Err(e) = self.scheduler.shutdown().await {
            warn!("Failed to shut down scheduler cleanly: {}", e);
        }
        result
    }
}

/// One sweep, logging in first if no earlier login succeeded.
/// Recoverable failures are logged and swallowed, fatal ones are returned.
async fn run_sweep(orchestrator: &Mutex<SyncOrchestrator>) -> Result<(), SweepError> {
    let mut orchestrator = orchestrator.lock().await;
    let result = match orchestrator.ensure_authenticated().await {
        Ok(()) => orchestrator.sync().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(report) => {
            info!(
                operation = "scheduled_sync_complete",
                pushed = report.pushed,
                completed_fixes = report.completed_fixes,
                unresolved = report.unresolved,
                rejected = report.rejected,
                duration_ms = report.duration.as_millis() as u64,
                "Sync completed successfully"
            );
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!(operation = "scheduled_sync_error", fatal = true, error = %e, "Sync failed");
            Err(e)
        }
        Err(e) => {
            warn!(
                operation = "scheduled_sync_error",
                fatal = false,
                error = %e,
                "Sync failed, will retry at the next scheduled run"
            );
            Ok(())
        }
    }
}

pub async fn run_daemon(schedule_override: Option<String>, no_startup_sync: bool, output: &Output) -> Result<()> {
    let config = load_config()?;
    let path_manager = PathManager::default();

    let mut scheduler_config = config.scheduler_or_default();
    if let Some(schedule) = schedule_override {
        validate_schedule(&schedule).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
        scheduler_config.schedule = schedule;
    }
    if no_startup_sync {
        scheduler_config.run_on_startup = false;
    }

    // Login happens inside each sweep so an outage at startup is retried
    let orchestrator = build_orchestrator(&config, &path_manager, SweepOptions::from_config(&config))?;

    output.info(format!(
        "Daemon started with schedule '{}'. Logs: {}",
        scheduler_config.schedule,
        path_manager.log_dir().display()
    ));

    Scheduler::new(orchestrator, scheduler_config)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create scheduler: {}", e))?
        .run()
        .await
}
