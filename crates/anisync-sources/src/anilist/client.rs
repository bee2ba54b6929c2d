use crate::anilist::api::{
    auth_error, join_errors, listing_from_collection, save_variables, CollectionData, GraphQlResponse, ViewerData,
    GRAPHQL_URL, LIST_QUERY, SAVE_MUTATION, SERVICE, VIEWER_QUERY,
};
use crate::error::SourceError;
use crate::traits::{PushOutcome, TrackingService};
use anisync_models::{RemoteListing, WatchStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct AniListClient {
    client: Client,
    access_token: String,
    username: Option<String>,
    request_delay: Duration,
}

impl AniListClient {
    pub fn new(access_token: String, username: Option<String>, request_delay: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("anisync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::api(SERVICE, format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            access_token,
            username: username.filter(|u| !u.trim().is_empty()),
            request_delay,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// POST one GraphQL document.
    ///
    /// Returns the raw response so callers can decide how non-auth GraphQL
    /// errors are treated; auth failures are always surfaced as `Err`.
    async fn post<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<GraphQlResponse<T>, SourceError> {
        let response = self
            .client
            .post(GRAPHQL_URL)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| SourceError::from_transport(SERVICE, e));

        // Rate limit: 90 requests per minute
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let response = response?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::from_transport(SERVICE, e))?;

        let parsed: GraphQlResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                if let Some(err) = auth_error(status, &[]) {
                    return Err(err);
                }
                if status.is_server_error() {
                    return Err(SourceError::unreachable(SERVICE, format!("{} - {}", status, body)));
                }
                return Err(SourceError::api(SERVICE, format!("Unexpected response ({}): {}", status, e)));
            }
        };

        if let Some(err) = auth_error(status, parsed.errors.as_deref().unwrap_or(&[])) {
            return Err(err);
        }

        Ok(parsed)
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, SourceError> {
        let response = self.post::<T>(query, variables).await?;
        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            return Err(SourceError::api(SERVICE, join_errors(&errors)));
        }
        response
            .data
            .ok_or_else(|| SourceError::api(SERVICE, "Response contained no data"))
    }
}

#[async_trait]
impl TrackingService for AniListClient {
    fn service_name(&self) -> &str {
        "AniList"
    }

    async fn authenticate(&mut self) -> Result<(), SourceError> {
        if self.access_token.trim().is_empty() {
            return Err(SourceError::auth(
                SERVICE,
                "AniList access token not found in credentials. Run 'anisync config anilist' first",
            ));
        }

        let data: ViewerData = self.query(VIEWER_QUERY, json!({})).await?;
        info!("Authenticated to AniList as {}", data.viewer.name);
        if self.username.is_none() {
            self.username = Some(data.viewer.name);
        }
        Ok(())
    }

    async fn get_user_entries(&self) -> Result<RemoteListing, SourceError> {
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| SourceError::auth(SERVICE, "Not authenticated to AniList"))?;

        info!(operation = "remote_list_fetch", username, "Fetching user's list from AniList");
        let data: CollectionData = self.query(LIST_QUERY, json!({ "username": username })).await?;
        let listing = listing_from_collection(data.collection);
        debug!("AniList: {} entries on list", listing.len());
        Ok(listing)
    }

    async fn push_update(
        &self,
        tracking_id: &str,
        progress: u32,
        status: WatchStatus,
    ) -> Result<PushOutcome, SourceError> {
        info!(operation = "remote_push", tracking_id, progress, %status, "Updating {} to {}", tracking_id, status);

        let variables = match save_variables(tracking_id, progress, status) {
            Ok(variables) => variables,
            Err(e) => return Ok(PushOutcome::Rejected { reason: e.to_string() }),
        };

        match self.post::<Value>(SAVE_MUTATION, variables).await {
            Ok(response) => match response.errors.filter(|e| !e.is_empty()) {
                None => Ok(PushOutcome::Applied),
                Some(errors) => Ok(PushOutcome::Rejected { reason: join_errors(&errors) }),
            },
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                warn!(tracking_id, error = %e, "AniList update failed");
                Ok(PushOutcome::Rejected { reason: e.to_string() })
            }
        }
    }
}
