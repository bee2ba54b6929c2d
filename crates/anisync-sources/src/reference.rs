use crate::error::SourceError;
use crate::traits::ReferenceFetcher;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "reference";

/// Plain HTTP GET of a reference dataset
pub struct HttpReferenceFetcher {
    client: Client,
}

impl HttpReferenceFetcher {
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("anisync/", env!("CARGO_PKG_VERSION")))
            // anime-offline-database is tens of megabytes
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| SourceError::api(SERVICE, format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReferenceFetcher for HttpReferenceFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        debug!(operation = "reference_fetch", url, "Downloading reference dataset");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_transport(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::from_status(SERVICE, status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::from_transport(SERVICE, e))?;
        debug!(operation = "reference_fetch", url, bytes = bytes.len(), "Reference dataset downloaded");
        Ok(bytes.to_vec())
    }
}
