//! JSON wire format of the generic generation adapter.
//!
//! Request: `{"instruction": "...", "attachments": [{"mime_type", "data"}], "model"?}`
//! with base64 `data`. Response: `{"parts": [...]}` where each part is
//! either inline media `{"mime_type", "data"}` or `{"text"}`.

use serde::{Deserialize, Serialize};
use vitrine_core::{GenerationError, GenerationRequest, Media};

/// Inline media, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineMedia {
    pub mime_type: String,
    pub data: String,
}

impl From<&Media> for InlineMedia {
    fn from(media: &Media) -> Self {
        Self {
            mime_type: media.mime_type.clone(),
            data: media.to_base64(),
        }
    }
}

/// Body sent for one generation request.
#[derive(Debug, Serialize)]
pub struct GenerateBody<'a> {
    pub instruction: &'a str,
    pub attachments: Vec<InlineMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

impl<'a> GenerateBody<'a> {
    pub fn new(request: &'a GenerationRequest, model: Option<&'a str>) -> Self {
        Self {
            instruction: &request.instruction,
            attachments: request.attachments.iter().map(InlineMedia::from).collect(),
            model,
        }
    }
}

/// One part of a generation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsePart {
    Media(InlineMedia),
    Text { text: String },
}

/// Response returned by the adapter endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

impl GenerateResponse {
    /// Pick the first usable media part.
    ///
    /// - no parts at all, or only empty/undecodable media: `EmptyResponse`
    /// - text but no media: `NoMediaInResponse`
    pub fn into_media(self) -> Result<Media, GenerationError> {
        let mut saw_text = false;
        for part in self.parts {
            match part {
                ResponsePart::Media(inline) if !inline.data.trim().is_empty() => {
                    match Media::from_base64(inline.mime_type, &inline.data) {
                        Ok(media) => return Ok(media),
                        Err(e) => tracing::warn!(error = %e, "Skipping undecodable media part"),
                    }
                }
                ResponsePart::Media(_) => {}
                ResponsePart::Text { text } => {
                    tracing::debug!(text = %text, "Generation returned text part");
                    saw_text = true;
                }
            }
        }
        if saw_text {
            Err(GenerationError::NoMediaInResponse)
        } else {
            Err(GenerationError::EmptyResponse)
        }
    }
}
