//! Resolve an affordance's payload: registry lookup for `blob:` refs, fetch for URLs

use log::{debug, warn};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Url};

use super::affordance::Locator;
use super::filename::content_disposition_filename;
use crate::blob::{Blob, BlobRegistry};
use crate::error::SaveError;

/// Payload plus the server-suggested name, if the response carried one
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub blob: Blob,
    pub suggested_name: Option<String>,
}

#[derive(Clone)]
pub struct PayloadResolver {
    registry: BlobRegistry,
    client: Client,
}

impl PayloadResolver {
    pub fn new(registry: BlobRegistry, client: Client) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &BlobRegistry {
        &self.registry
    }

    pub async fn resolve(&self, locator: &Locator) -> Result<FetchedPayload, SaveError> {
        match locator {
            Locator::Ephemeral(token) => {
                let blob = self.registry.resolve_str(token).ok_or_else(|| {
                    SaveError::PayloadUnavailable(format!("{} was released", token))
                })?;
                Ok(FetchedPayload {
                    blob,
                    suggested_name: None,
                })
            }
            Locator::Network(url) => self.fetch(url).await,
            Locator::Unsupported(href) => Err(SaveError::PayloadUnavailable(format!(
                "unsupported locator {}",
                href
            ))),
        }
    }

    /// Credentialed GET; the client's cookie store carries the session
    async fn fetch(&self, url: &Url) -> Result<FetchedPayload, SaveError> {
        debug!("payload_fetch: {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!("payload_fetch_failed: {} error={}", url, e);
            SaveError::FetchFailed(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("payload_fetch_failed: {} status={}", url, status);
            return Err(SaveError::FetchFailed(format!("HTTP {}", status.as_u16())));
        }

        let suggested_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(content_disposition_filename);
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SaveError::FetchFailed(format!("Failed to read body: {}", e)))?;
        debug!("payload_fetched: {} bytes={} type={}", url, bytes.len(), mime_type);

        Ok(FetchedPayload {
            blob: Blob::new(bytes, mime_type),
            suggested_name,
        })
    }
}
