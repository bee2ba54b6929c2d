use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, daemon, ledger, sync};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "anisync")]
#[command(about = "anisync - Keep your AniList in step with what you watched on Plex")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation sweep
    #[command(long_about = "Refresh the reference datasets if they are stale, push watch progress from each configured Plex library to AniList, then mark fully watched AniList entries as completed.")]
    Sync {
        /// Resolve and decide without writing to AniList
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,

        /// Library to sweep instead of the configured list (repeatable)
        #[arg(long = "library", value_name = "NAME")]
        libraries: Vec<String>,
    },
    /// Run as daemon with internal scheduler
    #[command(long_about = "Run anisync in the foreground and sweep on the configured cron schedule. A sweep runs on startup unless --no-startup-sync is given. Authentication, reference data and storage failures stop the daemon.")]
    Daemon {
        /// Cron schedule with seconds (e.g., '0 0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip initial sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
    /// Show shows whose mapping or update failed
    #[command(long_about = "Print the error ledger: Plex shows (by TVDB id) and seasons that could not be mapped to AniList or whose update was rejected. Entries need manual attention.")]
    Ledger,
    /// Configure credentials and settings
    #[command(long_about = "Manage configuration and credentials. Running without a subcommand configures Plex and then AniList interactively.")]
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
    /// Clear cached data
    #[command(long_about = "Clear local state. Use --cache for the TVDB to AniList identity cache, --ledger for the error ledger, --reference for the downloaded reference datasets, or --all for everything.")]
    Clear {
        /// Clear cache, ledger and reference data
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,

        /// Clear the identity cache
        #[arg(long, action = ArgAction::SetTrue)]
        cache: bool,

        /// Clear the error ledger
        #[arg(long, action = ArgAction::SetTrue)]
        ledger: bool,

        /// Delete downloaded reference datasets (re-fetched on next sync)
        #[arg(long, action = ArgAction::SetTrue)]
        reference: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show tokens unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure the Plex server
    #[command(long_about = "Configure the Plex server URL, the libraries to sweep and the Plex token. The token can be found by inspecting network requests in Plex Web (X-Plex-Token).")]
    Plex {
        /// Plex token (if not provided, will prompt)
        #[arg(long)]
        token: Option<String>,

        /// Plex server URL, e.g. http://127.0.0.1:32400
        #[arg(long)]
        server_url: Option<String>,

        /// Library to sweep (repeatable; replaces the configured list)
        #[arg(long = "library", value_name = "NAME")]
        libraries: Vec<String>,
    },

    /// Configure AniList
    #[command(long_about = "Configure the AniList access token and optionally the user whose list is read. Create a token at https://anilist.co/settings/developer.")]
    Anilist {
        /// AniList access token (if not provided, will prompt)
        #[arg(long)]
        token: Option<String>,

        /// AniList user name (defaults to the token's owner)
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The daemon also keeps a rotating log file
    let log_file = match cli.command {
        Commands::Daemon { .. } => Some(anisync_config::PathManager::default().daemon_log_file()),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync { dry_run, libraries } => sync::run_sync(dry_run, libraries, &output).await,
        Commands::Daemon {
            schedule,
            no_startup_sync,
        } => daemon::run_daemon(schedule, no_startup_sync, &output).await,
        Commands::Ledger => ledger::run_ledger(&output),
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
        Commands::Clear {
            all,
            cache,
            ledger,
            reference,
        } => clear::run_clear(all, cache, ledger, reference, &output),
    }
}
