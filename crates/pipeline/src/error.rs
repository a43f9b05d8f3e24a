use vitrine_core::{BatchError, GenerationError};

/// Batch-level failures. Per-task failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A shared step every task depends on failed before fan-out began.
    #[error("Prerequisite failed: {0}")]
    PrerequisiteFailed(GenerationError),

    /// The targets could not form a batch.
    #[error("Invalid batch: {0}")]
    InvalidBatch(#[from] BatchError),
}
