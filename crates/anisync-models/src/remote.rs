use crate::status::WatchStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user's list entry on the tracking service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEntry {
    pub progress: Option<u32>,
    pub total_episodes: Option<u32>,
    pub status: WatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RemoteEntry {
    /// Every episode is watched but the entry was never closed out.
    pub fn is_completion_pending(&self) -> bool {
        match (self.progress, self.total_episodes) {
            (Some(progress), Some(total)) => progress == total && self.status != WatchStatus::Completed,
            _ => false,
        }
    }
}

/// Full remote listing keyed by tracking id
pub type RemoteListing = BTreeMap<String, RemoteEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(progress: Option<u32>, total: Option<u32>, status: WatchStatus) -> RemoteEntry {
        RemoteEntry { progress, total_episodes: total, status, title: None }
    }

    #[test]
    fn test_completion_pending() {
        assert!(entry(Some(12), Some(12), WatchStatus::Current).is_completion_pending());
        assert!(entry(Some(12), Some(12), WatchStatus::Paused).is_completion_pending());
        assert!(!entry(Some(12), Some(12), WatchStatus::Completed).is_completion_pending());
        assert!(!entry(Some(11), Some(12), WatchStatus::Current).is_completion_pending());
        assert!(!entry(Some(12), None, WatchStatus::Current).is_completion_pending());
        assert!(!entry(None, Some(12), WatchStatus::Current).is_completion_pending());
    }
}
