//! Fan-out execution of Vitrine generation batches.
//!
//! - [`FanOutOrchestrator`] drives a [`Batch`](vitrine_core::Batch) through
//!   a [`GenerationClient`](vitrine_core::GenerationClient), isolating
//!   per-task failures and publishing every state change.
//! - [`ConcurrencyPolicy`] chooses between sequential and bounded
//!   in-flight submissions.
//! - [`prepare`] resolves lazily-referenced media before tasks exist.

pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod prepare;

pub use error::PipelineError;
pub use orchestrator::FanOutOrchestrator;
pub use policy::ConcurrencyPolicy;
pub use prepare::{prepare_batch, prepare_seed, MediaSource, SeedSource, TargetSource};
