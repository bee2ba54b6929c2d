use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// List status on the tracking service.
///
/// Only `Current`, `Planning` and `Completed` are ever derived from local
/// watch progress. The other three are set by the user on the remote side
/// and only influence whether an update is pushed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    Current,
    Planning,
    Completed,
    Dropped,
    Paused,
    Repeating,
}

impl WatchStatus {
    pub const ALL: [WatchStatus; 6] = [
        WatchStatus::Current,
        WatchStatus::Planning,
        WatchStatus::Completed,
        WatchStatus::Dropped,
        WatchStatus::Paused,
        WatchStatus::Repeating,
    ];

    /// Wire name used by the tracking service (`MediaListStatus`)
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Current => "CURRENT",
            WatchStatus::Planning => "PLANNING",
            WatchStatus::Completed => "COMPLETED",
            WatchStatus::Dropped => "DROPPED",
            WatchStatus::Paused => "PAUSED",
            WatchStatus::Repeating => "REPEATING",
        }
    }

    /// Stopped on purpose by the user; progress alone must not revive it.
    pub fn is_intentionally_stopped(&self) -> bool {
        matches!(self, WatchStatus::Dropped | WatchStatus::Paused)
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WatchStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown watch status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip_through_serde() {
        let json = serde_json::to_string(&WatchStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let parsed: WatchStatus = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(parsed, WatchStatus::Paused);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("current".parse::<WatchStatus>().unwrap(), WatchStatus::Current);
        assert_eq!("REPEATING".parse::<WatchStatus>().unwrap(), WatchStatus::Repeating);
        assert!("WATCHING".parse::<WatchStatus>().is_err());
    }

    #[test]
    fn test_intentionally_stopped() {
        assert!(WatchStatus::Dropped.is_intentionally_stopped());
        assert!(WatchStatus::Paused.is_intentionally_stopped());
        assert!(!WatchStatus::Completed.is_intentionally_stopped());
        assert!(!WatchStatus::Current.is_intentionally_stopped());
    }
}
