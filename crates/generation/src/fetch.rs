//! [`RemoteFetcher`] backed by a plain HTTP GET.

use async_trait::async_trait;
use vitrine_core::{FetchedBody, MediaError, RemoteFetcher};

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, MediaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::unreadable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::unreadable(url, format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::unreadable(url, e))?
            .to_vec();

        tracing::debug!(url, status = status.as_u16(), bytes = bytes.len(), "Fetched remote body");
        Ok(FetchedBody { content_type, bytes })
    }
}
