//! Resolution of lazily-referenced media into a runnable [`Batch`].
//!
//! Hosts often describe targets by where their media lives rather than
//! the bytes themselves. Target media that cannot be read becomes a task
//! that fails with `UnreadableSource` when the batch runs; unreadable seed
//! media fails the whole batch before fan-out.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vitrine_core::batch::validate_target_ids;
use vitrine_core::{
    Batch, BatchError, GenerationError, ItemTask, Media, MediaError, Recipe, RemoteFetcher, Seed,
    Target,
};

use crate::error::PipelineError;

/// Where a piece of media comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Inline(Media),
    /// `data:<mime>;base64,<payload>`
    DataUri(String),
    File(PathBuf),
    Remote(String),
}

impl MediaSource {
    pub async fn resolve(&self, fetcher: &dyn RemoteFetcher) -> Result<Media, MediaError> {
        match self {
            Self::Inline(media) => Ok(media.clone()),
            Self::DataUri(uri) => Media::from_data_uri(uri),
            Self::File(path) => Media::from_file(path).await,
            Self::Remote(url) => Media::from_remote(fetcher, url).await,
        }
    }

    /// Short human-readable reference for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Inline(media) => format!("inline {}", media.mime_type),
            Self::DataUri(_) => "data uri".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

/// A target whose media has not been loaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSource {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub media: Option<MediaSource>,
}

impl TargetSource {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: MediaSource) -> Self {
        self.media = Some(media);
        self
    }
}

/// A seed whose reference media has not been loaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSource {
    pub instruction_text: String,
    #[serde(default)]
    pub reference: Option<MediaSource>,
}

/// Load the seed's reference media. Failure is fatal to the batch.
pub async fn prepare_seed(source: &SeedSource, fetcher: &dyn RemoteFetcher) -> Result<Seed, PipelineError> {
    let mut seed = Seed::new(source.instruction_text.clone());
    if let Some(reference) = &source.reference {
        let media = reference.resolve(fetcher).await.map_err(|e| {
            tracing::error!(source = %reference.describe(), error = %e, "Seed reference unreadable");
            PipelineError::PrerequisiteFailed(e.into())
        })?;
        seed = seed.with_reference(media);
    }
    Ok(seed)
}

/// Resolve every target's media in order and build one task per target.
///
/// Ids are validated before anything is fetched. A target whose media is
/// unreadable, or whose request cannot be built, still gets a task; it
/// fails when the batch runs without reaching the generation client.
pub async fn prepare_batch(
    seed: Seed,
    sources: Vec<TargetSource>,
    recipe: &Recipe,
    fetcher: &dyn RemoteFetcher,
) -> Result<Batch, BatchError> {
    let bare: Vec<Target> = sources
        .iter()
        .map(|s| Target::new(s.id.clone(), s.label.clone()))
        .collect();
    validate_target_ids(&bare)?;

    let mut tasks = Vec::with_capacity(sources.len());
    for (source, mut target) in sources.into_iter().zip(bare) {
        if let Some(media_source) = &source.media {
            match media_source.resolve(fetcher).await {
                Ok(media) => target = target.with_media(media),
                Err(e) => {
                    tracing::warn!(
                        target_id = %target.id,
                        source = %media_source.describe(),
                        error = %e,
                        "Target media unreadable",
                    );
                    tasks.push(ItemTask::unresolved(target, GenerationError::from(e)));
                    continue;
                }
            }
        }

        let task = match recipe.build(&seed, &target) {
            Ok(request) => ItemTask::new(target, request),
            Err(reason) => ItemTask::unresolved(target, reason),
        };
        tasks.push(task);
    }

    Batch::from_tasks(seed, tasks)
}
