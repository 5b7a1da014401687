use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{AppError, AppResult, ProviderError, ProviderResult};
use crate::utils::url::UrlUtils;

/// Builds the shared reqwest client with bounded timeouts
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    connect_timeout: Duration,
    request_timeout: Duration,
    user_agent: String,
}

impl HttpClientFactory {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn build(&self) -> AppResult<StandardHttpClient> {
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(StandardHttpClient { client })
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(30))
    }
}

/// Thin wrapper over a shared reqwest client. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    /// GET a JSON document. Non-2xx statuses and decode failures are errors.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> ProviderResult<T> {
        let safe_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching JSON document from: {}", safe_url);

        let response = self.send(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::request(&safe_url, e.to_string()))?;

        debug!("Fetched {} bytes from {}", bytes.len(), safe_url);

        serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::decode(safe_url, format!("invalid JSON: {e}")))
    }

    async fn send(&self, url: &str) -> ProviderResult<Response> {
        let response = self.client.get(url).send().await.map_err(|e| {
            ProviderError::request(UrlUtils::obfuscate_credentials(url), e.without_url().to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                url: UrlUtils::obfuscate_credentials(url),
            });
        }
        Ok(response)
    }
}
