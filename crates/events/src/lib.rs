//! Vitrine batch event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`BatchEvent`]: serializable task/batch state changes.
//! - [`BusObserver`]: adapts the bus to the orchestrator's observer
//!   contract.

pub mod bus;
pub mod events;

pub use bus::{BusObserver, EventBus};
pub use events::BatchEvent;
