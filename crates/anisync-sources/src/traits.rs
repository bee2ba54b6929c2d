use crate::error::SourceError;
use anisync_models::{LibrarySeason, RemoteListing, WatchStatus};
use async_trait::async_trait;

/// Result of asking the tracking service to save a list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Applied,
    /// The service refused the update or could not be reached; the entry
    /// needs manual review.
    Rejected { reason: String },
}

/// The local media server
#[async_trait]
pub trait LibrarySource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn authenticate(&mut self) -> Result<(), SourceError>;

    /// Every non-special season in the named library, fully materialized.
    /// An unknown library yields an empty list.
    async fn enumerate(&self, library: &str) -> Result<Vec<LibrarySeason>, SourceError>;
}

/// The remote anime tracking service
#[async_trait]
pub trait TrackingService: Send + Sync {
    fn service_name(&self) -> &str;

    async fn authenticate(&mut self) -> Result<(), SourceError>;

    /// The authenticated user's full list keyed by tracking id
    async fn get_user_entries(&self) -> Result<RemoteListing, SourceError>;

    /// Save progress and status for one entry.
    ///
    /// Fails closed: every failure other than rejected credentials comes back
    /// as `PushOutcome::Rejected`. Only `SourceError::AuthInvalid` is returned
    /// as an error.
    async fn push_update(
        &self,
        tracking_id: &str,
        progress: u32,
        status: WatchStatus,
    ) -> Result<PushOutcome, SourceError>;
}

/// Downloads a reference dataset body
#[async_trait]
pub trait ReferenceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}
