//! Inbound progress contract between the orchestrator and the host.

use serde::{Deserialize, Serialize};

use crate::result::BatchResult;
use crate::task::ItemTask;

/// Snapshot of how far a batch has got, sent with every task update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Tasks in a terminal state.
    pub completed: usize,
    pub total: usize,
    /// Id of the task that changed.
    pub current: String,
}

impl BatchProgress {
    /// Completion percentage (0-100). An empty batch is 100%.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

/// Receives read-only snapshots while a batch runs.
///
/// Both callbacks are invoked from the orchestrator's own continuation,
/// never concurrently.
pub trait BatchObserver: Send + Sync {
    fn on_task_update(&self, task: &ItemTask, progress: &BatchProgress);

    /// Fires exactly once per run, after every task is terminal.
    fn on_batch_complete(&self, result: &BatchResult);
}

/// Adapter turning a pair of closures into a [`BatchObserver`].
pub struct Callbacks<U, C> {
    on_update: U,
    on_complete: C,
}

impl<U, C> Callbacks<U, C>
where
    U: Fn(&ItemTask, &BatchProgress) + Send + Sync,
    C: Fn(&BatchResult) + Send + Sync,
{
    pub fn new(on_update: U, on_complete: C) -> Self {
        Self {
            on_update,
            on_complete,
        }
    }
}

impl<U, C> BatchObserver for Callbacks<U, C>
where
    U: Fn(&ItemTask, &BatchProgress) + Send + Sync,
    C: Fn(&BatchResult) + Send + Sync,
{
    fn on_task_update(&self, task: &ItemTask, progress: &BatchProgress) {
        (self.on_update)(task, progress)
    }

    fn on_batch_complete(&self, result: &BatchResult) {
        (self.on_complete)(result)
    }
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_task_update(&self, _task: &ItemTask, _progress: &BatchProgress) {}
    fn on_batch_complete(&self, _result: &BatchResult) {}
}
