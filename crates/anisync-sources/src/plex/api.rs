use crate::error::SourceError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub(crate) const SERVICE: &str = "plex";

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryInfo {
    pub key: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Guid {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowMetadata {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    pub title: String,
    /// Primary agent GUID, e.g. `com.plexapp.agents.thetvdb://81797?lang=en`
    #[serde(default)]
    pub guid: Option<String>,
    /// External ids attached by the modern agent, e.g. `tvdb://81797`
    #[serde(rename = "Guid", default)]
    pub guids: Vec<Guid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonMetadata {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    /// Season number; absent on the synthetic "All episodes" entry
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(rename = "viewedLeafCount", default)]
    pub viewed_leaf_count: u32,
}

#[derive(Debug, Deserialize)]
struct MediaContainer<T> {
    #[serde(rename = "Metadata", default = "Vec::new")]
    metadata: Vec<T>,
    #[serde(rename = "Directory", default = "Vec::new")]
    directory: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PlexResponse<T> {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer<T>,
}

pub struct PlexHttpClient {
    client: Client,
    server_url: String,
}

impl PlexHttpClient {
    pub fn new(token: &str, server_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token)
                        .map_err(|_| SourceError::auth(SERVICE, "Invalid token format"))?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static("anisync"),
                );
                headers
            })
            .build()
            .map_err(|e| SourceError::api(SERVICE, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<PlexResponse<T>, SourceError> {
        let url = format!("{}{}", self.server_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::from_transport(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::from_status(SERVICE, status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::api(SERVICE, format!("Failed to parse response from {}: {}", path, e)))
    }

    /// Doubles as the token check: the server answers 401 for a bad token
    pub async fn get_libraries(&self) -> Result<Vec<LibraryInfo>, SourceError> {
        let response: PlexResponse<LibraryInfo> = self.get_json("/library/sections").await?;
        let libraries = response.media_container.directory;
        debug!("Plex: Found {} library sections", libraries.len());
        Ok(libraries)
    }

    pub async fn get_shows(&self, library_key: &str) -> Result<Vec<ShowMetadata>, SourceError> {
        let path = format!("/library/sections/{}/all?type=2&includeGuids=1", library_key);
        let response: PlexResponse<ShowMetadata> = self.get_json(&path).await?;
        debug!("Plex get_shows: Found {} items in library", response.media_container.metadata.len());
        Ok(response.media_container.metadata)
    }

    pub async fn get_seasons(&self, show_rating_key: &str) -> Result<Vec<SeasonMetadata>, SourceError> {
        let path = format!("/library/metadata/{}/children", show_rating_key);
        let response: PlexResponse<SeasonMetadata> = self.get_json(&path).await?;
        Ok(response.media_container.metadata)
    }
}
