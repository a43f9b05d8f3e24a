//! Per-target unit of work and its one-directional lifecycle.

use serde::{Deserialize, Serialize};

use crate::batch::Target;
use crate::error::GenerationError;
use crate::media::Media;
use crate::request::GenerationRequest;

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Lifecycle of a single [`ItemTask`].
///
/// ```text
/// Pending ──> Generating ──> Succeeded | Failed
///    │
///    ├──> Failed     (inputs could not be resolved)
///    └──> Cancelled  (batch stopped scheduling)
/// ```
///
/// Terminal states never change again; a retry is a new task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "outcome", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Generating,
    Succeeded(Media),
    Failed(GenerationError),
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_) | Self::Cancelled)
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Generating => "Generating",
            Self::Succeeded(_) => "Succeeded",
            Self::Failed(_) => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Attempted transition not allowed by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Task {task_id}: cannot move from {from} to {to}")]
pub struct TransitionError {
    pub task_id: String,
    pub from: &'static str,
    pub to: &'static str,
}

// ---------------------------------------------------------------------------
// Task input
// ---------------------------------------------------------------------------

/// The request a task will submit, or the reason it could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskInput {
    Ready(GenerationRequest),
    /// Fails the task without ever calling the client.
    Unresolved(GenerationError),
}

// ---------------------------------------------------------------------------
// ItemTask
// ---------------------------------------------------------------------------

/// One target bound to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTask {
    pub target: Target,
    pub input: TaskInput,
    state: TaskState,
}

impl ItemTask {
    pub fn new(target: Target, request: GenerationRequest) -> Self {
        Self {
            target,
            input: TaskInput::Ready(request),
            state: TaskState::Pending,
        }
    }

    pub fn unresolved(target: Target, reason: GenerationError) -> Self {
        Self {
            target,
            input: TaskInput::Unresolved(reason),
            state: TaskState::Pending,
        }
    }

    /// Stable id, shared with the target.
    pub fn id(&self) -> &str {
        &self.target.id
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn request(&self) -> Option<&GenerationRequest> {
        match &self.input {
            TaskInput::Ready(request) => Some(request),
            TaskInput::Unresolved(_) => None,
        }
    }

    /// `Pending -> Generating`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        match self.state {
            TaskState::Pending => {
                self.state = TaskState::Generating;
                Ok(())
            }
            _ => Err(self.rejected("Generating")),
        }
    }

    /// `Generating -> Succeeded`.
    pub fn succeed(&mut self, media: Media) -> Result<(), TransitionError> {
        match self.state {
            TaskState::Generating => {
                self.state = TaskState::Succeeded(media);
                Ok(())
            }
            _ => Err(self.rejected("Succeeded")),
        }
    }

    /// `Pending | Generating -> Failed`.
    pub fn fail(&mut self, reason: GenerationError) -> Result<(), TransitionError> {
        match self.state {
            TaskState::Pending | TaskState::Generating => {
                self.state = TaskState::Failed(reason);
                Ok(())
            }
            _ => Err(self.rejected("Failed")),
        }
    }

    /// `Pending -> Cancelled`. In-flight tasks are never cancelled.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        match self.state {
            TaskState::Pending => {
                self.state = TaskState::Cancelled;
                Ok(())
            }
            _ => Err(self.rejected("Cancelled")),
        }
    }

    fn rejected(&self, to: &'static str) -> TransitionError {
        TransitionError {
            task_id: self.target.id.clone(),
            from: self.state.label(),
            to,
        }
    }
}
