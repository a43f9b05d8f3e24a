//! Canonical in-memory media and its transport codec.
//!
//! Every attachment the pipeline touches ends up as a [`Media`]: a MIME
//! type plus the raw payload bytes. Local files, remote URLs and data URIs
//! coming from an upload widget all converge on this one value, so request
//! building and the vendor adapter never deal with base64 or MIME
//! splitting themselves.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::client::RemoteFetcher;
use crate::error::MediaError;

/// MIME used when neither the source nor the payload reveals a type.
pub const FALLBACK_MIME: &str = "application/octet-stream";

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// A binary asset with an explicit MIME type.
///
/// Serializes with the payload as a standard base64 string so batch
/// events can carry artifacts over JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub mime_type: String,
    #[serde(with = "base64_payload")]
    pub payload: Vec<u8>,
}

impl std::fmt::Debug for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Media")
            .field("mime_type", &self.mime_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl Media {
    pub fn new(mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload,
        }
    }

    /// Build from a MIME type and a standard base64 payload.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self, MediaError> {
        let payload = BASE64
            .decode(data.trim())
            .map_err(|e| MediaError::InvalidDataUri(format!("bad base64 payload: {e}")))?;
        Ok(Self::new(mime_type, payload))
    }

    /// Read a local file, taking the MIME type from its extension and
    /// falling back to the payload's magic bytes.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::unreadable(path.display().to_string(), e))?;

        let declared = mime_guess::from_path(path)
            .first_raw()
            .filter(|m| *m != FALLBACK_MIME);
        let mime_type = declared
            .or_else(|| sniff_mime(&payload))
            .unwrap_or(FALLBACK_MIME);

        tracing::debug!(
            path = %path.display(),
            mime_type,
            bytes = payload.len(),
            "Loaded media from file",
        );
        Ok(Self::new(mime_type, payload))
    }

    /// Fetch a remote URL through the host-supplied fetcher.
    ///
    /// The response content type wins; parameters such as `charset` are
    /// dropped. A missing content type falls back to sniffing.
    pub async fn from_remote(fetcher: &dyn RemoteFetcher, url: &str) -> Result<Self, MediaError> {
        let body = fetcher.fetch(url).await?;

        let mime_type = body
            .content_type
            .as_deref()
            .map(essence)
            .filter(|m| !m.is_empty() && *m != FALLBACK_MIME)
            .map(str::to_string)
            .or_else(|| sniff_mime(&body.bytes).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        tracing::debug!(url, mime_type = %mime_type, bytes = body.bytes.len(), "Fetched remote media");
        Ok(Self::new(mime_type, body.bytes))
    }

    /// Parse a `data:<mime>;base64,<payload>` URI back into media.
    pub fn from_data_uri(uri: &str) -> Result<Self, MediaError> {
        let rest = uri
            .trim()
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or_else(|| MediaError::InvalidDataUri("missing `data:` prefix".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| MediaError::InvalidDataUri("missing `,` separator".into()))?;
        let header = header
            .strip_suffix(BASE64_MARKER)
            .ok_or_else(|| MediaError::InvalidDataUri("only base64 data URIs are supported".into()))?;

        let mime_type = match essence(header) {
            "" => FALLBACK_MIME,
            m => m,
        };
        Self::from_base64(mime_type, data)
    }

    /// Render as a data URI a renderer can display directly.
    pub fn to_data_uri(&self) -> String {
        format!(
            "{DATA_URI_PREFIX}{}{BASE64_MARKER},{}",
            self.mime_type,
            self.to_base64()
        )
    }

    /// The payload in standard base64, as vendors expect it inline.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.payload)
    }

    /// Preferred file extension for saving this media.
    pub fn extension(&self) -> &'static str {
        if let Some(format) = image::ImageFormat::from_mime_type(&self.mime_type) {
            if let Some(ext) = format.extensions_str().first().copied() {
                return ext;
            }
        }
        mime_guess::get_mime_extensions_str(&self.mime_type)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin")
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Guess an image MIME type from the leading magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// `image/png; charset=x` -> `image/png`.
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s).map_err(serde::de::Error::custom)
    }
}
