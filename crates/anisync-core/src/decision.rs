use anisync_models::WatchStatus;
use serde::Serialize;
use std::fmt;
use crate::show_state::ShowState;

/// Why a season needs no write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No tracking id; the season is already in the error ledger
    Unresolved,
    /// Completed entries are never downgraded
    RemoteCompleted,
    /// Dropped or paused remotely and no progress past that point
    RemoteStopped,
    UpToDate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::Unresolved => "unresolved",
            SkipReason::RemoteCompleted => "already completed",
            SkipReason::RemoteStopped => "dropped or paused",
            SkipReason::UpToDate => "up to date",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    NoOp(SkipReason),
    Push,
}

impl UpdateDecision {
    pub fn is_push(&self) -> bool {
        matches!(self, UpdateDecision::Push)
    }
}

/// Decide whether a season's local state should be written to the tracker.
///
/// Rules apply in order; the first that matches wins.
pub fn decide(state: &ShowState) -> UpdateDecision {
    if state.tracking_id.is_none() {
        return UpdateDecision::NoOp(SkipReason::Unresolved);
    }

    let remote_status = state.remote_status;
    if remote_status == Some(WatchStatus::Completed) {
        return UpdateDecision::NoOp(SkipReason::RemoteCompleted);
    }

    // A stopped entry always has a progress value on AniList; treat a
    // missing one as zero
    if remote_status.is_some_and(|s| s.is_intentionally_stopped())
        && state.watched_episodes <= state.remote_progress.unwrap_or(0)
    {
        return UpdateDecision::NoOp(SkipReason::RemoteStopped);
    }

    let status_changed = remote_status != Some(state.status);
    let progressed = match state.remote_progress {
        None => true,
        Some(remote_progress) => state.watched_episodes > remote_progress,
    };
    if status_changed || progressed {
        UpdateDecision::Push
    } else {
        UpdateDecision::NoOp(SkipReason::UpToDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(
        tracking_id: Option<&str>,
        status: WatchStatus,
        watched_episodes: u32,
        remote_status: Option<WatchStatus>,
        remote_progress: Option<u32>,
    ) -> ShowState {
        ShowState {
            title: "Mushishi".to_string(),
            local_id: "80644".to_string(),
            season_number: "1".to_string(),
            watched_episodes,
            tracking_id: tracking_id.map(str::to_string),
            total_episodes: Some(26),
            remote_progress,
            remote_status,
            status,
        }
    }

    #[test]
    fn test_unresolved_is_always_noop() {
        for remote in [None, Some(WatchStatus::Current), Some(WatchStatus::Dropped)] {
            let s = state(None, WatchStatus::Completed, 26, remote, None);
            assert_eq!(decide(&s), UpdateDecision::NoOp(SkipReason::Unresolved));
        }
    }

    #[test]
    fn test_remote_completed_is_never_downgraded() {
        for (status, watched, progress) in [
            (WatchStatus::Current, 3, Some(26)),
            (WatchStatus::Completed, 26, Some(26)),
            (WatchStatus::Current, 30, None),
        ] {
            let s = state(Some("457"), status, watched, Some(WatchStatus::Completed), progress);
            assert_eq!(decide(&s), UpdateDecision::NoOp(SkipReason::RemoteCompleted));
        }
    }

    #[test]
    fn test_dropped_needs_forward_progress() {
        let s = state(Some("457"), WatchStatus::Current, 2, Some(WatchStatus::Dropped), Some(5));
        assert_eq!(decide(&s), UpdateDecision::NoOp(SkipReason::RemoteStopped));

        let s = state(Some("457"), WatchStatus::Current, 5, Some(WatchStatus::Paused), Some(5));
        assert_eq!(decide(&s), UpdateDecision::NoOp(SkipReason::RemoteStopped));

        let s = state(Some("457"), WatchStatus::Current, 6, Some(WatchStatus::Dropped), Some(5));
        assert_eq!(decide(&s), UpdateDecision::Push);
    }

    #[test]
    fn test_no_change_is_noop() {
        let s = state(Some("457"), WatchStatus::Current, 4, Some(WatchStatus::Current), Some(4));
        assert_eq!(decide(&s), UpdateDecision::NoOp(SkipReason::UpToDate));

        // Local regression is not pushed either
        let s = state(Some("457"), WatchStatus::Current, 3, Some(WatchStatus::Current), Some(4));
        assert_eq!(decide(&s), UpdateDecision::NoOp(SkipReason::UpToDate));
    }

    #[test]
    fn test_push_cases() {
        // Not on the list yet
        let s = state(Some("457"), WatchStatus::Current, 4, None, None);
        assert!(decide(&s).is_push());

        // Progress moved
        let s = state(Some("457"), WatchStatus::Current, 5, Some(WatchStatus::Current), Some(4));
        assert!(decide(&s).is_push());

        // Status differs with equal progress
        let s = state(Some("457"), WatchStatus::Current, 4, Some(WatchStatus::Planning), Some(4));
        assert!(decide(&s).is_push());

        // Rewatching shows count as a status change
        let s = state(Some("457"), WatchStatus::Current, 4, Some(WatchStatus::Repeating), Some(4));
        assert!(decide(&s).is_push());
    }
}
