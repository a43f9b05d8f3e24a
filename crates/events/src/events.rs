//! Serializable events emitted while a batch runs.
//!
//! These mirror the [`BatchObserver`](vitrine_core::BatchObserver)
//! callbacks as owned values, so they can cross a broadcast channel or be
//! forwarded to a browser as JSON.

use serde::{Deserialize, Serialize};
use vitrine_core::types::BatchId;
use vitrine_core::{BatchProgress, BatchResult, ItemTask};

/// A batch-level state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// One task changed state. Keyed by task id, not position.
    TaskUpdated {
        batch_id: BatchId,
        task: ItemTask,
        progress: BatchProgress,
    },

    /// Every task is terminal; carries the full outcome summary.
    BatchCompleted { result: BatchResult },
}

impl BatchEvent {
    /// Dot-separated event name, e.g. `"task.updated"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TaskUpdated { .. } => "task.updated",
            Self::BatchCompleted { .. } => "batch.completed",
        }
    }

    pub fn batch_id(&self) -> BatchId {
        match self {
            Self::TaskUpdated { batch_id, .. } => *batch_id,
            Self::BatchCompleted { result } => result.batch_id,
        }
    }
}
