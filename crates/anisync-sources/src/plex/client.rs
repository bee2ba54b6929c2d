use crate::error::SourceError;
use crate::plex::api::{PlexHttpClient, SeasonMetadata, ShowMetadata, SERVICE};
use crate::traits::LibrarySource;
use anisync_models::LibrarySeason;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Plex Media Server library access
pub struct PlexLibrary {
    token: String,
    server_url: String,
    api: Option<PlexHttpClient>,
}

impl PlexLibrary {
    pub fn new(token: String, server_url: String) -> Self {
        Self {
            token,
            server_url,
            api: None,
        }
    }

    fn api(&self) -> Result<&PlexHttpClient, SourceError> {
        self.api
            .as_ref()
            .ok_or_else(|| SourceError::auth(SERVICE, "Not authenticated to Plex"))
    }

    /// TVDB id of a show.
    ///
    /// The modern agent lists it in the `Guid` array as `tvdb://81797`; the
    /// legacy TheTVDB agent puts it in the primary GUID as
    /// `com.plexapp.agents.thetvdb://81797?lang=en`.
    pub fn parse_local_id(show: &ShowMetadata) -> Option<String> {
        if let Some(id) = show
            .guids
            .iter()
            .find_map(|guid| guid.id.strip_prefix("tvdb://"))
        {
            return Some(id.to_string());
        }

        let guid = show.guid.as_deref()?;
        if !guid.contains("thetvdb://") {
            return None;
        }
        let id = guid.rsplit('/').next()?.split('?').next()?.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    fn is_specials(season: &SeasonMetadata) -> bool {
        season.title.eq_ignore_ascii_case("specials")
    }

    fn seasons_for_show(show: &ShowMetadata, local_id: &str, seasons: Vec<SeasonMetadata>) -> Vec<LibrarySeason> {
        seasons
            .into_iter()
            .filter(|season| !Self::is_specials(season))
            .filter_map(|season| {
                let index = season.index?;
                Some(LibrarySeason::new(
                    show.title.clone(),
                    local_id,
                    index.to_string(),
                    season.viewed_leaf_count,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl LibrarySource for PlexLibrary {
    fn source_name(&self) -> &str {
        "Plex"
    }

    async fn authenticate(&mut self) -> Result<(), SourceError> {
        if self.token.trim().is_empty() {
            return Err(SourceError::auth(
                SERVICE,
                "Plex token not found in credentials. Run 'anisync config plex' first",
            ));
        }

        let api = PlexHttpClient::new(&self.token, &self.server_url)?;
        api.get_libraries().await?;
        self.api = Some(api);

        info!("Authenticated to Plex server at {}", self.server_url);
        Ok(())
    }

    async fn enumerate(&self, library: &str) -> Result<Vec<LibrarySeason>, SourceError> {
        let api = self.api()?;
        debug!("Plex: Getting shows for library {}", library);

        let sections = api.get_libraries().await?;
        let Some(section) = sections.iter().find(|s| s.title == library) else {
            warn!("Plex: Library '{}' not found on server, nothing to sync", library);
            return Ok(Vec::new());
        };

        let shows = api.get_shows(&section.key).await?;
        let mut result = Vec::new();
        let mut skipped = 0;

        for show in &shows {
            let Some(local_id) = Self::parse_local_id(show) else {
                skipped += 1;
                warn!(
                    title = %show.title,
                    guid = show.guid.as_deref().unwrap_or(""),
                    "Plex: Show has no TVDB id, skipping"
                );
                continue;
            };

            let seasons = api.get_seasons(&show.rating_key).await?;
            result.extend(Self::seasons_for_show(show, &local_id, seasons));
        }

        info!(
            operation = "library_enumerated",
            library,
            shows = shows.len(),
            seasons = result.len(),
            skipped,
            "Plex: Library enumerated"
        );
        Ok(result)
    }
}
