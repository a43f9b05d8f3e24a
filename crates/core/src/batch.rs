//! Seeds, targets, recipes and the batch that owns their tasks.
//!
//! A [`Batch`] is created in one synchronous step, before any network
//! call, so the host can render one placeholder per target immediately.
//! From then on only the orchestrator mutates it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, GenerationError};
use crate::media::Media;
use crate::observer::BatchProgress;
use crate::request::{self, GenerationRequest};
use crate::task::{ItemTask, TransitionError};
use crate::types::{BatchId, TargetId, Timestamp};

// ---------------------------------------------------------------------------
// Seed and targets
// ---------------------------------------------------------------------------

/// The user's creative input. Immutable once a batch starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    /// May be empty when a reference image alone is supplied.
    pub instruction_text: String,
    pub reference_media: Option<Media>,
}

impl Seed {
    pub fn new(instruction_text: impl Into<String>) -> Self {
        Self {
            instruction_text: instruction_text.into(),
            reference_media: None,
        }
    }

    pub fn with_reference(mut self, media: Media) -> Self {
        self.reference_media = Some(media);
        self
    }

    /// A design needs a non-blank prompt, a reference image, or both.
    pub fn has_design_input(&self) -> bool {
        !self.instruction_text.trim().is_empty() || self.reference_media.is_some()
    }

    /// Request for the shared design generated once before a mockup fan-out.
    pub fn design_request(&self) -> GenerationRequest {
        request::design_from_prompt(&self.instruction_text, self.reference_media.as_ref())
    }
}

/// One thing the batch must produce an artifact for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub label: String,
    /// E.g. the product's own reference photo.
    pub auxiliary_media: Option<Media>,
}

impl Target {
    pub fn new(id: impl Into<TargetId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            auxiliary_media: None,
        }
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.auxiliary_media = Some(media);
        self
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// How each target's request is derived from the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    /// The design, printed on each target's product photo.
    Mockup { design: Media },
    /// The subject re-shot per target; the target label is the variant.
    Perspective { subject: Media, subject_label: String },
    /// Each target's product placed into the seed's reference scene.
    CompositeIntoScene,
    /// The seed concept rendered once per style; the target label is the style.
    StyledPreview,
}

impl Recipe {
    /// Build the request for one target, or say which input is missing.
    pub fn build(&self, seed: &Seed, target: &Target) -> Result<GenerationRequest, GenerationError> {
        match self {
            Self::Mockup { design } => {
                let product = target.auxiliary_media.as_ref().ok_or_else(|| {
                    GenerationError::MissingAttachment(format!("product photo for {}", target.label))
                })?;
                Ok(request::mockup_of(design, product, &target.label))
            }
            Self::Perspective {
                subject,
                subject_label,
            } => Ok(request::perspective_of(subject, subject_label, &target.label)),
            Self::CompositeIntoScene => {
                let scene = seed.reference_media.as_ref().ok_or_else(|| {
                    GenerationError::MissingAttachment("reference scene".to_string())
                })?;
                let product = target.auxiliary_media.as_ref().ok_or_else(|| {
                    GenerationError::MissingAttachment(format!("product photo for {}", target.label))
                })?;
                Ok(request::composite_onto(&seed.instruction_text, scene, product))
            }
            Self::StyledPreview => Ok(request::styled_preview_of(
                &seed.instruction_text,
                &target.label,
                seed.reference_media.as_ref(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mockup { .. } => "mockup",
            Self::Perspective { .. } => "perspective",
            Self::CompositeIntoScene => "composite_into_scene",
            Self::StyledPreview => "styled_preview",
        }
    }
}

// ---------------------------------------------------------------------------
// Batch status
// ---------------------------------------------------------------------------

/// `NotStarted -> Running -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    NotStarted,
    Running,
    /// Every task is terminal (some may have failed or been cancelled).
    Completed,
}

impl BatchStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::Running => "Running",
            Self::Completed => "Completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// A seed plus one task per target, with aggregate timing and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub seed: Seed,
    tasks: Vec<ItemTask>,
    started_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    status: BatchStatus,
}

/// Build a batch with one task per target, in target order.
///
/// Pure and synchronous. Targets missing media the recipe needs become
/// tasks that fail without calling the client.
pub fn create_batch(seed: Seed, targets: Vec<Target>, recipe: &Recipe) -> Result<Batch, BatchError> {
    let tasks = targets
        .into_iter()
        .map(|target| match recipe.build(&seed, &target) {
            Ok(request) => ItemTask::new(target, request),
            Err(reason) => ItemTask::unresolved(target, reason),
        })
        .collect();
    Batch::from_tasks(seed, tasks)
}

impl Batch {
    /// Wrap prepared tasks, checking that target ids are non-empty and unique.
    pub fn from_tasks(seed: Seed, tasks: Vec<ItemTask>) -> Result<Self, BatchError> {
        validate_target_ids(tasks.iter().map(|t| &t.target))?;
        Ok(Self {
            id: uuid::Uuid::new_v4(),
            seed,
            tasks,
            started_at: None,
            completed_at: None,
            status: BatchStatus::NotStarted,
        })
    }

    pub fn tasks(&self) -> &[ItemTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&ItemTask> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.state().is_terminal()).count()
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.state().is_terminal())
    }

    /// Progress snapshot after the task at `index` changed.
    pub fn progress(&self, index: usize) -> BatchProgress {
        BatchProgress {
            completed: self.completed_count(),
            total: self.tasks.len(),
            current: self
                .tasks
                .get(index)
                .map(|t| t.id().to_string())
                .unwrap_or_default(),
        }
    }

    // ---- orchestrator-side mutation ----

    /// `NotStarted -> Running`, stamping `started_at`.
    pub fn mark_running(&mut self, at: Timestamp) -> Result<(), TransitionError> {
        if self.status != BatchStatus::NotStarted {
            return Err(self.rejected("Running"));
        }
        self.status = BatchStatus::Running;
        self.started_at = Some(at);
        Ok(())
    }

    /// `Running -> Completed`; only once every task is terminal.
    pub fn mark_completed(&mut self, at: Timestamp) -> Result<(), TransitionError> {
        if self.status != BatchStatus::Running || !self.is_finished() {
            return Err(self.rejected("Completed"));
        }
        self.status = BatchStatus::Completed;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Mutable access to one task. Only the orchestrator should call this.
    pub fn task_mut(&mut self, index: usize) -> Option<&mut ItemTask> {
        self.tasks.get_mut(index)
    }

    fn rejected(&self, to: &'static str) -> TransitionError {
        TransitionError {
            task_id: self.id.to_string(),
            from: self.status.label(),
            to,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Target ids must be non-empty and unique within a batch.
pub fn validate_target_ids<'a>(targets: impl IntoIterator<Item = &'a Target>) -> Result<(), BatchError> {
    let mut seen = HashSet::new();
    for target in targets {
        if target.id.trim().is_empty() {
            return Err(BatchError::EmptyTargetId(target.label.clone()));
        }
        if !seen.insert(target.id.as_str()) {
            return Err(BatchError::DuplicateTarget(target.id.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
