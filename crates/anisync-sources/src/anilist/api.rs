use crate::error::SourceError;
use anisync_models::{RemoteEntry, RemoteListing, WatchStatus};
use serde::Deserialize;
use serde_json::Value;

pub(crate) const SERVICE: &str = "anilist";
pub(crate) const GRAPHQL_URL: &str = "https://graphql.anilist.co";

/// Error message AniList puts in `errors[].message` for a bad or revoked
/// token. AniList exposes no error code for this, so the literal text is the
/// contract.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

pub(crate) const VIEWER_QUERY: &str = r#"
query {
    Viewer {
        name
    }
}
"#;

pub(crate) const LIST_QUERY: &str = r#"
query ($username: String) {
    MediaListCollection(userName: $username, type: ANIME) {
        lists {
            name
            status
            isCustomList
            entries {
                id
                progress
                status
                media {
                    id
                    episodes
                    title {
                        romaji
                        english
                    }
                }
            }
        }
    }
}
"#;

pub(crate) const SAVE_MUTATION: &str = r#"
mutation ($mediaId: Int, $status: MediaListStatus, $progress: Int) {
    SaveMediaListEntry(mediaId: $mediaId, status: $status, progress: $progress) {
        id
        status
        progress
    }
}
"#;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerData {
    #[serde(rename = "Viewer")]
    pub viewer: Viewer,
}

#[derive(Debug, Deserialize)]
pub struct Viewer {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CollectionData {
    #[serde(rename = "MediaListCollection")]
    pub collection: MediaListCollection,
}

#[derive(Debug, Deserialize)]
pub struct MediaListCollection {
    #[serde(default)]
    pub lists: Vec<MediaList>,
}

#[derive(Debug, Deserialize)]
pub struct MediaList {
    #[serde(default)]
    pub name: Option<String>,
    /// Null for custom lists
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub entries: Vec<MediaListEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MediaListEntry {
    #[serde(default)]
    pub progress: Option<u32>,
    pub status: WatchStatus,
    pub media: Media,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    pub id: u64,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub title: Option<MediaTitle>,
}

#[derive(Debug, Deserialize)]
pub struct MediaTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
}

/// Auth failure if the GraphQL errors say so, otherwise `None`
pub fn auth_error(http_status: reqwest::StatusCode, errors: &[GraphQlError]) -> Option<SourceError> {
    if http_status == reqwest::StatusCode::UNAUTHORIZED {
        return Some(SourceError::auth(SERVICE, http_status.to_string()));
    }
    errors
        .iter()
        .find(|e| e.status == Some(401) || e.message.trim().eq_ignore_ascii_case(INVALID_TOKEN_MESSAGE))
        .map(|e| SourceError::auth(SERVICE, e.message.clone()))
}

pub fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Flatten the status lists into one listing keyed by media id.
///
/// Custom lists repeat entries from the status lists and carry no status,
/// so they are skipped.
pub fn listing_from_collection(collection: MediaListCollection) -> RemoteListing {
    let mut listing = RemoteListing::new();
    for list in collection.lists {
        let is_status_list = list
            .status
            .as_deref()
            .map(|s| s.parse::<WatchStatus>().is_ok())
            .unwrap_or(false);
        if !is_status_list {
            continue;
        }

        for entry in list.entries {
            let title = entry
                .media
                .title
                .and_then(|t| t.english.or(t.romaji));
            listing.insert(
                entry.media.id.to_string(),
                RemoteEntry {
                    progress: entry.progress,
                    total_episodes: entry.media.episodes,
                    status: entry.status,
                    title,
                },
            );
        }
    }
    listing
}

/// Variables for `SaveMediaListEntry`; AniList wants the media id as an Int
pub fn save_variables(tracking_id: &str, progress: u32, status: WatchStatus) -> Result<Value, SourceError> {
    let media_id: u64 = tracking_id
        .parse()
        .map_err(|_| SourceError::api(SERVICE, format!("Tracking id '{}' is not numeric", tracking_id)))?;
    Ok(serde_json::json!({
        "mediaId": media_id,
        "status": status.as_str(),
        "progress": progress,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_invalid_token_message_is_auth_error() {
        let body = r#"{"errors":[{"message":"Invalid token","status":400,"locations":[{"line":2,"column":5}]}],"data":null}"#;
        let parsed: GraphQlResponse<ViewerData> = serde_json::from_str(body).unwrap();
        let errors = parsed.errors.unwrap();
        let err = auth_error(StatusCode::BAD_REQUEST, &errors).unwrap();
        assert!(err.is_auth());
    }

    #[test]
    fn test_unauthorized_status_is_auth_error() {
        assert!(auth_error(StatusCode::UNAUTHORIZED, &[]).unwrap().is_auth());
    }

    #[test]
    fn test_validation_error_is_not_auth_error() {
        let errors = vec![GraphQlError {
            message: "validation".to_string(),
            status: Some(400),
        }];
        assert!(auth_error(StatusCode::BAD_REQUEST, &errors).is_none());
        assert_eq!(join_errors(&errors), "validation");
    }

    #[test]
    fn test_listing_from_collection() {
        let body = r#"{"data":{"MediaListCollection":{"lists":[
            {"name":"Watching","status":"CURRENT","isCustomList":false,"entries":[
                {"id":1,"progress":3,"status":"CURRENT","media":{"id":21,"episodes":12,"title":{"romaji":"Kimetsu","english":"Demon Slayer"}}}]},
            {"name":"Rewatching","status":"REPEATING","isCustomList":false,"entries":[
                {"id":2,"progress":0,"status":"REPEATING","media":{"id":1,"episodes":26,"title":{"romaji":"Cowboy Bebop","english":null}}}]},
            {"name":"Favourites","status":null,"isCustomList":true,"entries":[
                {"id":3,"progress":5,"status":"PAUSED","media":{"id":99,"episodes":null,"title":null}}]},
            {"name":"Completed","status":"COMPLETED","isCustomList":false,"entries":[
                {"id":4,"progress":24,"status":"COMPLETED","media":{"id":30,"episodes":null}}]}
        ]}}}"#;
        let parsed: GraphQlResponse<CollectionData> = serde_json::from_str(body).unwrap();
        let listing = listing_from_collection(parsed.data.unwrap().collection);

        assert_eq!(listing.len(), 3);
        let demon_slayer = &listing["21"];
        assert_eq!(demon_slayer.progress, Some(3));
        assert_eq!(demon_slayer.total_episodes, Some(12));
        assert_eq!(demon_slayer.status, WatchStatus::Current);
        assert_eq!(demon_slayer.title.as_deref(), Some("Demon Slayer"));
        assert_eq!(listing["1"].title.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(listing["30"].total_episodes, None);
        assert!(!listing.contains_key("99"));
    }

    #[test]
    fn test_save_variables() {
        let vars = save_variables("21", 12, WatchStatus::Completed).unwrap();
        assert_eq!(vars["mediaId"], 21);
        assert_eq!(vars["status"], "COMPLETED");
        assert_eq!(vars["progress"], 12);
        assert!(save_variables("not-a-number", 1, WatchStatus::Current).is_err());
    }
}
