use serde::{Deserialize, Serialize};

/// Failures while turning a file, URL, or data URI into [`Media`](crate::Media).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// The local file or remote URL could not be read into bytes.
    #[error("Unreadable source {source_ref}: {reason}")]
    UnreadableSource { source_ref: String, reason: String },

    /// A displayable form did not follow `data:<mime>;base64,<payload>`.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
}

impl MediaError {
    pub fn unreadable(source_ref: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnreadableSource {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }
}

/// Why a single generation attempt produced no artifact.
///
/// Returned by [`GenerationClient::submit`](crate::GenerationClient::submit)
/// and stored verbatim in a failed task, so it is cloneable and
/// serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GenerationError {
    /// No credential or model was configured for the generation capability.
    #[error("Generation is not configured: {0}")]
    NotConfigured(String),

    /// The engine was reached but returned nothing usable.
    #[error("Generation returned an empty response")]
    EmptyResponse,

    /// The engine answered with text only when an artifact was required.
    #[error("Generation response contained no media")]
    NoMediaInResponse,

    /// Network failure, timeout, or rate limiting.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Media the request depended on could not be read.
    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    /// The recipe needed media the target did not provide.
    #[error("Missing attachment: {0}")]
    MissingAttachment(String),
}

/// Rejected batch construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// Two targets share an id; tasks are keyed by it.
    #[error("Duplicate target id: {0}")]
    DuplicateTarget(String),

    /// A target id was empty or whitespace.
    #[error("Target id must not be empty (label: {0})")]
    EmptyTargetId(String),
}

impl GenerationError {
    /// Short stable label, used in logs and placeholder rendering.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::EmptyResponse => "empty_response",
            Self::NoMediaInResponse => "no_media_in_response",
            Self::Transport(_) => "transport",
            Self::UnreadableSource(_) => "unreadable_source",
            Self::MissingAttachment(_) => "missing_attachment",
        }
    }
}

impl From<MediaError> for GenerationError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnreadableSource { .. } => Self::UnreadableSource(err.to_string()),
            MediaError::InvalidDataUri(_) => Self::UnreadableSource(err.to_string()),
        }
    }
}
