use serde::{Deserialize, Serialize};

/// One season of a show as seen by the local media server.
///
/// Produced once per sweep by the library source; `local_id` is the TVDB id
/// the server's metadata agent matched the show to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibrarySeason {
    pub title: String,
    pub local_id: String,
    pub season_number: String,
    pub watched_episodes: u32,
}

impl LibrarySeason {
    pub fn new(
        title: impl Into<String>,
        local_id: impl Into<String>,
        season_number: impl Into<String>,
        watched_episodes: u32,
    ) -> Self {
        Self {
            title: title.into(),
            local_id: local_id.into(),
            season_number: season_number.into(),
            watched_episodes,
        }
    }
}
