use anisync_sources::SourceError;
use thiserror::Error;

/// Why a sweep stopped early
#[derive(Debug, Error)]
pub enum SweepError {
    /// Credentials were rejected; nothing works until they are replaced
    #[error("authentication failed: {0}")]
    AuthInvalid(#[source] SourceError),

    /// A collaborator could not be reached or answered nonsense; the next
    /// scheduled sweep may succeed
    #[error("remote service error: {0}")]
    Remote(#[source] SourceError),

    /// A reference dataset could not be refreshed or parsed
    #[error("reference data unavailable: {0:#}")]
    ReferenceData(anyhow::Error),

    /// The identity cache or error ledger could not be written
    #[error("local storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl SweepError {
    /// Fatal errors end the run loop; only remote hiccups are worth waiting out
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SweepError::Remote(_))
    }
}

impl From<SourceError> for SweepError {
    fn from(err: SourceError) -> Self {
        if err.is_auth() {
            SweepError::AuthInvalid(err)
        } else {
            SweepError::Remote(err)
        }
    }
}
