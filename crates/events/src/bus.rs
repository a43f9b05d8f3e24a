//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`BatchEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the host application;
//! [`EventBus::observer`] adapts it to the orchestrator's observer
//! contract for one batch.

use tokio::sync::broadcast;
use vitrine_core::types::BatchId;
use vitrine_core::{BatchObserver, BatchProgress, BatchResult, ItemTask};

use crate::events::BatchEvent;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use vitrine_events::EventBus;
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
/// let observer = bus.observer(uuid::Uuid::new_v4());
/// // pass `&observer` to the orchestrator
/// ```
pub struct EventBus {
    sender: broadcast::Sender<BatchEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is silently dropped.
    pub fn publish(&self, event: BatchEvent) {
        tracing::trace!(
            event_type = event.event_type(),
            batch_id = %event.batch_id(),
            "Publishing batch event",
        );
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    /// Observer that publishes every callback of one batch onto this bus.
    pub fn observer(&self, batch_id: BatchId) -> BusObserver<'_> {
        BusObserver {
            bus: self,
            batch_id,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// BusObserver
// ---------------------------------------------------------------------------

/// [`BatchObserver`] that forwards snapshots to an [`EventBus`].
pub struct BusObserver<'a> {
    bus: &'a EventBus,
    batch_id: BatchId,
}

impl BatchObserver for BusObserver<'_> {
    fn on_task_update(&self, task: &ItemTask, progress: &BatchProgress) {
        self.bus.publish(BatchEvent::TaskUpdated {
            batch_id: self.batch_id,
            task: task.clone(),
            progress: progress.clone(),
        });
    }

    fn on_batch_complete(&self, result: &BatchResult) {
        self.bus.publish(BatchEvent::BatchCompleted {
            result: result.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
