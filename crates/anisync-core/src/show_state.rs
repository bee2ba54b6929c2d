use anisync_models::{LibrarySeason, RemoteEntry, WatchStatus};
use serde::Serialize;

/// Everything known about one library season at decision time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowState {
    pub title: String,
    pub local_id: String,
    pub season_number: String,
    pub watched_episodes: u32,
    pub tracking_id: Option<String>,
    pub total_episodes: Option<u32>,
    pub remote_progress: Option<u32>,
    pub remote_status: Option<WatchStatus>,
    /// Status the local watch count implies
    pub status: WatchStatus,
}

impl ShowState {
    /// `remote` is the listing entry for `tracking_id`, if the show is on the
    /// user's list
    pub fn new(season: LibrarySeason, tracking_id: Option<String>, remote: Option<&RemoteEntry>) -> Self {
        let total_episodes = remote.and_then(|r| r.total_episodes);
        let status = derive_status(season.watched_episodes, total_episodes);
        Self {
            title: season.title,
            local_id: season.local_id,
            season_number: season.season_number,
            watched_episodes: season.watched_episodes,
            tracking_id,
            total_episodes,
            remote_progress: remote.and_then(|r| r.progress),
            remote_status: remote.map(|r| r.status),
            status,
        }
    }
}

/// Status implied by the local watch count.
///
/// The completion check runs first, so a zero-episode show with nothing
/// watched is Completed rather than Planning. With an unknown episode total
/// a show can never be complete.
pub fn derive_status(watched_episodes: u32, total_episodes: Option<u32>) -> WatchStatus {
    match total_episodes {
        Some(total) if watched_episodes >= total => WatchStatus::Completed,
        _ if watched_episodes == 0 => WatchStatus::Planning,
        _ => WatchStatus::Current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_status() {
        assert_eq!(derive_status(12, Some(12)), WatchStatus::Completed);
        assert_eq!(derive_status(13, Some(12)), WatchStatus::Completed);
        assert_eq!(derive_status(11, Some(12)), WatchStatus::Current);
        assert_eq!(derive_status(500, None), WatchStatus::Current);
        assert_eq!(derive_status(3, None), WatchStatus::Current);
        assert_eq!(derive_status(0, Some(0)), WatchStatus::Completed);
        assert_eq!(derive_status(0, Some(12)), WatchStatus::Planning);
        assert_eq!(derive_status(0, None), WatchStatus::Planning);
    }

    #[test]
    fn test_new_from_remote_entry() {
        let season = LibrarySeason::new("Frieren", "424536", "1", 28);
        let remote = RemoteEntry {
            progress: Some(10),
            total_episodes: Some(28),
            status: WatchStatus::Current,
            title: Some("Frieren".to_string()),
        };
        let state = ShowState::new(season, Some("154587".to_string()), Some(&remote));

        assert_eq!(state.status, WatchStatus::Completed);
        assert_eq!(state.remote_progress, Some(10));
        assert_eq!(state.remote_status, Some(WatchStatus::Current));
        assert_eq!(state.total_episodes, Some(28));
    }

    #[test]
    fn test_new_without_remote_entry() {
        let season = LibrarySeason::new("Frieren", "424536", "1", 3);
        let state = ShowState::new(season, Some("154587".to_string()), None);
        assert_eq!(state.status, WatchStatus::Current);
        assert_eq!(state.remote_status, None);
        assert_eq!(state.total_episodes, None);
    }
}
