//! Outbound capabilities the host injects into the pipeline.
//!
//! Neither trait knows anything about a vendor: endpoints, auth header
//! formats and model identifiers live entirely in the host's adapter.

use async_trait::async_trait;

use crate::error::{GenerationError, MediaError};
use crate::media::Media;
use crate::request::GenerationRequest;

/// A multimodal generation engine.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Submit one request and return the produced artifact.
    async fn submit(&self, request: &GenerationRequest) -> Result<Media, GenerationError>;

    /// Report missing configuration before any work is scheduled.
    ///
    /// The default assumes the client is always ready.
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}

/// Raw body returned by a [`RemoteFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    /// Value of the response `Content-Type` header, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// "Fetch bytes at URL", typically an HTTP GET.
///
/// Implementations report network failures and non-success statuses as
/// [`MediaError::UnreadableSource`].
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, MediaError>;
}
