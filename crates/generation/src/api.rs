//! HTTP adapter implementing [`GenerationClient`] over the generic wire
//! format in [`crate::wire`], using [`reqwest`].

use async_trait::async_trait;
use reqwest::StatusCode;
use vitrine_core::{GenerationClient, GenerationError, GenerationRequest, Media};

use crate::config::GenerationConfig;
use crate::wire::{GenerateBody, GenerateResponse};

/// Maximum number of response-body bytes kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for one generation endpoint.
pub struct HttpGenerationClient {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl HttpGenerationClient {
    /// Create a client with its own connection pool and the configured
    /// timeout applied to every request.
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for sharing a pool with a [`HttpFetcher`](crate::HttpFetcher)).
    pub fn with_client(client: reqwest::Client, config: GenerationConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn credential(&self) -> Result<&str, GenerationError> {
        self.config
            .credential
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("no credential supplied".into()))
    }

    // ---- private helpers ----

    /// Map a non-success status to the failure taxonomy.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(status_error(status, &body))
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Media, GenerationError> {
        let credential = self.credential()?;
        let body = GenerateBody::new(request, self.config.model.as_deref());

        tracing::debug!(
            endpoint = %self.config.endpoint,
            attachments = request.attachments.len(),
            attachment_bytes = request.attachment_bytes(),
            "Submitting generation request",
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::ensure_success(response).await?;
        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                GenerationError::EmptyResponse
            } else {
                transport_error(e)
            }
        })?;
        parsed.into_media()
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        self.credential().map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Transport(format!("request timed out: {err}"))
    } else {
        GenerationError::Transport(err.to_string())
    }
}

/// Auth failures are configuration problems; everything else, including
/// rate limiting, is transport.
fn status_error(status: StatusCode, body: &str) -> GenerationError {
    let body = truncate(body, MAX_ERROR_BODY);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::NotConfigured(format!("credential rejected ({status})"))
        }
        StatusCode::TOO_MANY_REQUESTS => GenerationError::Transport(format!("rate limited ({status}): {body}")),
        _ => GenerationError::Transport(format!("generation endpoint error ({status}): {body}")),
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
