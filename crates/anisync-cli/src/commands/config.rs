use super::prompts;
use crate::output::{Output, OutputFormat};
use anisync_config::{
    AniListConfig, Config, CredentialStore, LedgerConfig, PathManager, PlexConfig, ReferenceConfig,
};
use anisync_sources::{AniListClient, LibrarySource, PlexLibrary, TrackingService};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::io::IsTerminal;
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:32400";

pub async fn run_config(cmd: Option<crate::ConfigCommands>, output: &Output) -> Result<()> {
    match cmd {
        Some(crate::ConfigCommands::Show { full }) => show_config(full, output),
        Some(crate::ConfigCommands::Plex {
            token,
            server_url,
            libraries,
        }) => configure_plex(token, server_url, libraries, output).await,
        Some(crate::ConfigCommands::Anilist { token, username }) => configure_anilist(token, username, output).await,
        None => {
            configure_plex(None, None, Vec::new(), output).await?;
            configure_anilist(None, None, output).await
        }
    }
}

/// Load and validate the config file
pub fn load_config() -> Result<Config> {
    let config_file = PathManager::default().config_file();
    if !config_file.exists() {
        return Err(color_eyre::eyre::eyre!(
            "Configuration file not found at {}. Run 'anisync config' to set up your configuration.",
            config_file.display()
        ));
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;
    Ok(config)
}

fn load_or_default_config(path_manager: &PathManager, output: &Output) -> Result<Config> {
    let config_file = path_manager.config_file();
    if config_file.exists() {
        return Config::load_from_file(&config_file)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e));
    }
    output.info("Configuration file not found. Creating default configuration...");
    Ok(Config {
        plex: PlexConfig {
            server_url: DEFAULT_SERVER_URL.to_string(),
            libraries: vec!["Anime".to_string()],
        },
        anilist: AniListConfig::default(),
        reference: ReferenceConfig::default(),
        ledger: LedgerConfig::default(),
        scheduler: Some(anisync_config::default_scheduler_config()),
    })
}

fn load_credentials(path_manager: &PathManager) -> Result<CredentialStore> {
    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(cred_store)
}

fn save_all(path_manager: &PathManager, config: &Config, cred_store: &CredentialStore) -> Result<()> {
    let config_file = path_manager.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    cred_store
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials: {}", e))?;
    Ok(())
}

async fn configure_plex(
    token_arg: Option<String>,
    server_url_arg: Option<String>,
    libraries_arg: Vec<String>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;

    let mut config = load_or_default_config(&path_manager, output)?;
    let mut cred_store = load_credentials(&path_manager)?;

    print_section_header("Plex Setup", output);
    print_instruction_list(
        &[
            "The server URL is the address anisync uses to reach Plex, e.g. http://127.0.0.1:32400",
            "Your Plex token can be found by inspecting network requests in Plex Web (X-Plex-Token)",
            "Libraries are swept one after another in the order given",
        ],
        output,
    );
    output.println("");

    let server_url = match server_url_arg {
        Some(url) => url,
        None => prompts::prompt_string("Plex Server URL", Some(&config.plex.server_url))?,
    };
    let server_url = server_url.trim().trim_end_matches('/').to_string();
    if server_url.is_empty() {
        return Err(color_eyre::eyre::eyre!("Plex server URL is required"));
    }

    let libraries = if !libraries_arg.is_empty() {
        libraries_arg
    } else {
        let current = config.plex.libraries.join(", ");
        prompts::parse_list(&prompts::prompt_string("Libraries to sweep (comma-separated)", Some(&current))?)
    };
    if libraries.is_empty() {
        return Err(color_eyre::eyre::eyre!("At least one library is required"));
    }

    let token = match token_arg {
        Some(t) => t,
        None => prompts::prompt_token("Plex Token")?,
    };

    output.info("Verifying Plex token...");
    let mut plex = PlexLibrary::new(token.clone(), server_url.clone());
    match plex.authenticate().await {
        Ok(()) => output.success("Connected to Plex"),
        Err(e) if e.is_auth() => {
            output.warn(format!("Plex rejected the token: {}", e));
            if !prompts::prompt_yes_no("Save it anyway?", Some(false))? {
                return Err(color_eyre::eyre::eyre!("Plex token verification failed"));
            }
        }
        Err(e) => output.warn(format!("Could not reach Plex: {}. Continuing anyway...", e)),
    }

    config.plex.server_url = server_url;
    config.plex.libraries = libraries;
    cred_store.set_plex_token(token);
    save_all(&path_manager, &config, &cred_store)?;

    output.println("");
    output.success("Plex configuration saved!");
    output.println(format!("  Server URL: {}", config.plex.server_url));
    output.println(format!("  Libraries: {}", config.plex.libraries.join(", ")));
    Ok(())
}

async fn configure_anilist(token_arg: Option<String>, username_arg: Option<String>, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;

    let mut config = load_or_default_config(&path_manager, output)?;
    let mut cred_store = load_credentials(&path_manager)?;

    print_section_header("AniList Setup", output);
    print_instruction_list(
        &[
            "Create an API client at https://anilist.co/settings/developer",
            "Authorize it and copy the access token",
            "The list of the token's owner is used unless a user name is given",
        ],
        output,
    );
    output.println("");

    let token = match token_arg {
        Some(t) => t,
        None => prompts::prompt_token("AniList Access Token")?,
    };
    let username = match username_arg {
        Some(name) => Some(name),
        None if std::io::stdin().is_terminal() => {
            let current = config.anilist.username.clone().unwrap_or_default();
            Some(prompts::prompt_string(
                "AniList user name (press Enter for the token's owner)",
                Some(&current),
            )?)
        }
        None => config.anilist.username.clone(),
    }
    .map(|name| name.trim().to_string())
    .filter(|name| !name.is_empty());

    output.info("Verifying AniList token...");
    let mut client = AniListClient::new(token.clone(), username.clone(), Duration::ZERO)?;
    match client.authenticate().await {
        Ok(()) => output.success(format!(
            "Token accepted, reading the list of {}",
            client.username().unwrap_or("the token's owner")
        )),
        Err(e) if e.is_auth() => {
            output.warn(format!("AniList rejected the token: {}", e));
            if !prompts::prompt_yes_no("Save it anyway?", Some(false))? {
                return Err(color_eyre::eyre::eyre!("AniList token verification failed"));
            }
        }
        Err(e) => output.warn(format!("Could not reach AniList: {}. Continuing anyway...", e)),
    }

    config.anilist.username = username;
    cred_store.set_anilist_access_token(token);
    save_all(&path_manager, &config, &cred_store)?;

    output.println("");
    output.success("AniList configuration saved!");
    Ok(())
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'anisync config' to create it.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let cred_store = load_credentials(&path_manager)?;
    let show_secret = |secret: Option<String>| match secret {
        Some(s) if full => s,
        Some(s) => mask_string(&s),
        None => "<not set>".to_string(),
    };
    let plex_token = show_secret(cred_store.plex_token());
    let anilist_token = show_secret(cred_store.anilist_access_token());
    let scheduler = config.scheduler_or_default();

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            println!("\n{}", "Configuration".bright_cyan().bold());
            println!();

            let mut table = Table::new();
            table.set_header(vec![
                Cell::new("Setting").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").add_attribute(comfy_table::Attribute::Bold),
            ]);
            table.add_row(vec!["Config File".to_string(), config_file.display().to_string()]);
            table.add_row(vec!["Data Directory".to_string(), path_manager.data_dir().display().to_string()]);
            table.add_row(vec!["Plex Server URL".to_string(), config.plex.server_url.clone()]);
            table.add_row(vec!["Plex Libraries".to_string(), config.plex.libraries.join(", ")]);
            table.add_row(vec!["Plex Token".to_string(), plex_token]);
            table.add_row(vec![
                "AniList User".to_string(),
                config
                    .anilist
                    .username
                    .clone()
                    .unwrap_or_else(|| "<token owner>".to_string()),
            ]);
            table.add_row(vec!["AniList Token".to_string(), anilist_token]);
            table.add_row(vec![
                "AniList Request Delay".to_string(),
                format!("{} ms", config.anilist.request_delay_ms),
            ]);
            table.add_row(vec!["Anime List URL".to_string(), config.reference.anime_list_url.clone()]);
            table.add_row(vec![
                "Offline Database URL".to_string(),
                config.reference.offline_database_url.clone(),
            ]);
            table.add_row(vec![
                "Reference Max Age".to_string(),
                format!("{} s", config.reference.max_age_secs),
            ]);
            table.add_row(vec!["Ledger Retention".to_string(), format!("{:?}", config.ledger.retention)]);
            table.add_row(vec!["Schedule".to_string(), scheduler.schedule.clone()]);
            table.add_row(vec!["Sync On Startup".to_string(), scheduler.run_on_startup.to_string()]);
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", table);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file.display().to_string(),
                "plex": {
                    "server_url": config.plex.server_url,
                    "libraries": config.plex.libraries,
                    "token": plex_token,
                },
                "anilist": {
                    "username": config.anilist.username,
                    "request_delay_ms": config.anilist.request_delay_ms,
                    "access_token": anilist_token,
                },
                "reference": {
                    "anime_list_url": config.reference.anime_list_url,
                    "offline_database_url": config.reference.offline_database_url,
                    "max_age_secs": config.reference.max_age_secs,
                },
                "ledger": {
                    "retention": format!("{:?}", config.ledger.retention),
                },
                "scheduler": {
                    "schedule": scheduler.schedule,
                    "run_on_startup": scheduler.run_on_startup,
                },
            }));
        }
    }

    Ok(())
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Print a formatted section header
fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.len()).bright_cyan()));
}

/// Print a numbered instruction list
fn print_instruction_list(items: &[&str], output: &Output) {
    for (idx, item) in items.iter().enumerate() {
        output.println(format!("  {}. {}", idx + 1, item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string(""), "<not set>");
        assert_eq!(mask_string("abc"), "***");
        assert_eq!(mask_string("abcdefgh"), "ab***gh");
    }
}
