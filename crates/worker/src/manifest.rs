//! Batch manifest read by the worker.
//!
//! ```json
//! {
//!   "plan": { "kind": "mockup" },
//!   "seed": { "instruction_text": "a cat astronaut" },
//!   "targets": [
//!     { "id": "mug", "label": "Mug", "media": { "file": "products/mug.jpg" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use vitrine_pipeline::{MediaSource, SeedSource, TargetSource};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How each target's request is produced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plan {
    /// Generate a design from the seed, then mock it up on every product.
    Mockup,
    /// Re-shoot one subject once per target variant.
    Perspective {
        subject: MediaSource,
        subject_label: String,
    },
    /// Place every product into the seed's reference scene.
    CompositeIntoScene,
    /// Render the seed concept once per target style.
    StyledPreview,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub plan: Plan,
    pub seed: SeedSource,
    pub targets: Vec<TargetSource>,
}

impl Manifest {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: display.clone(),
                source,
            })?;
        Self::parse(&raw, &display)
    }

    /// Parse manifest JSON; `path` only labels errors.
    pub fn parse(raw: &str, path: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(raw).map_err(|source| ManifestError::Parse {
            path: path.to_string(),
            source,
        })
    }
}
