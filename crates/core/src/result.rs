//! Final batch summary and wall-clock timing.

use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{Batch, Target};
use crate::error::GenerationError;
use crate::media::Media;
use crate::task::TaskState;
use crate::types::{BatchId, Timestamp};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock start time paired with a monotonic instant.
///
/// `completed_at` is derived from the monotonic elapsed time, so it can
/// never precede `started_at` even if the system clock steps backwards.
#[derive(Debug, Clone, Copy)]
pub struct BatchClock {
    started_at: Timestamp,
    started: Instant,
}

impl BatchClock {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Completion timestamp and elapsed duration, read together.
    pub fn finish(&self) -> (Timestamp, Duration) {
        let elapsed = self.elapsed();
        let delta = TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero());
        (self.started_at + delta, elapsed)
    }
}

// ---------------------------------------------------------------------------
// BatchResult
// ---------------------------------------------------------------------------

/// Per-item outcomes of a completed batch, each list in target order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub elapsed: Duration,
    pub succeeded: Vec<(Target, Media)>,
    pub failed: Vec<(Target, GenerationError)>,
    /// Targets never submitted because scheduling was stopped.
    pub cancelled: Vec<Target>,
}

impl BatchResult {
    /// Summarise a batch whose tasks are all terminal.
    ///
    /// Tasks still pending or generating are not reported in any list.
    pub fn from_batch(batch: &Batch, started_at: Timestamp, completed_at: Timestamp, elapsed: Duration) -> Self {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut cancelled = Vec::new();

        for task in batch.tasks() {
            match task.state() {
                TaskState::Succeeded(media) => succeeded.push((task.target.clone(), media.clone())),
                TaskState::Failed(reason) => failed.push((task.target.clone(), reason.clone())),
                TaskState::Cancelled => cancelled.push(task.target.clone()),
                TaskState::Pending | TaskState::Generating => {}
            }
        }

        Self {
            batch_id: batch.id,
            started_at,
            completed_at,
            elapsed,
            succeeded,
            failed,
            cancelled,
        }
    }

    /// Elapsed wall-clock time in seconds, sub-second precision.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.cancelled.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }
}
