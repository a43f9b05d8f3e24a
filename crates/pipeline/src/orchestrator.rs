//! Fan-out orchestrator.
//!
//! Drives every task of a [`Batch`] through a [`GenerationClient`], one
//! submission per task. A single loop owns the batch: submissions run as
//! futures in a [`FuturesUnordered`] bounded by the [`ConcurrencyPolicy`],
//! and only the loop applies their outcomes. Task failures are recorded on
//! the task and never abort the batch.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use vitrine_core::{
    Batch, BatchClock, BatchError, BatchObserver, BatchResult, GenerationClient, GenerationError,
    GenerationRequest, Media, Recipe, Seed, Target, TaskInput,
};

use crate::error::PipelineError;
use crate::policy::ConcurrencyPolicy;

/// Runs batches against one generation client.
pub struct FanOutOrchestrator {
    client: Arc<dyn GenerationClient>,
    policy: ConcurrencyPolicy,
    submit_timeout: Option<Duration>,
}

impl FanOutOrchestrator {
    /// Sequential orchestrator with no submit timeout of its own.
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            policy: ConcurrencyPolicy::Sequential,
            submit_timeout: None,
        }
    }

    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound each submission; an expired submission fails its task with
    /// `Transport`.
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Fail fast when the client reports it cannot work at all.
    pub fn check_ready(&self) -> Result<(), PipelineError> {
        self.client
            .ensure_configured()
            .map_err(PipelineError::PrerequisiteFailed)
    }

    /// Execute every task of `batch` and summarise the outcome.
    ///
    /// Never fails: per-task errors land on the tasks and in the result.
    /// `observer` sees each task transition and exactly one completion.
    pub async fn run(&self, batch: &mut Batch, observer: &dyn BatchObserver) -> BatchResult {
        self.run_until_cancelled(batch, observer, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops starting tasks once `cancel` fires.
    ///
    /// Tasks that have not started end `Cancelled`; in-flight submissions
    /// finish. The token belongs to this run only.
    pub async fn run_until_cancelled(
        &self,
        batch: &mut Batch,
        observer: &dyn BatchObserver,
        cancel: &CancellationToken,
    ) -> BatchResult {
        let clock = BatchClock::start();
        let total = batch.len();

        if let Err(e) = batch.mark_running(clock.started_at()) {
            tracing::error!(batch_id = %batch.id, error = %e, "Batch cannot be run again");
            return recorded_result(batch, clock);
        }

        let limit = self.policy.limit();
        tracing::info!(batch_id = %batch.id, tasks = total, limit, "Batch started");

        let mut next = 0usize;
        let mut in_flight = FuturesUnordered::new();

        loop {
            while next < total && in_flight.len() < limit && !cancel.is_cancelled() {
                let index = next;
                next += 1;

                let Some(task) = batch.task_mut(index) else { break };
                let request = match &task.input {
                    TaskInput::Ready(request) => request.clone(),
                    TaskInput::Unresolved(reason) => {
                        let reason = reason.clone();
                        tracing::warn!(target_id = %task.id(), error = %reason, "Task input unresolved");
                        if let Err(e) = task.fail(reason) {
                            tracing::error!(error = %e, "Task transition rejected");
                        }
                        publish(batch, index, observer);
                        continue;
                    }
                };

                if let Err(e) = task.start() {
                    tracing::error!(error = %e, "Task transition rejected");
                    continue;
                }
                tracing::debug!(target_id = %task.id(), "Task generating");
                publish(batch, index, observer);

                in_flight.push(async move { (index, self.submit(&request).await) });
            }

            let Some((index, outcome)) = in_flight.next().await else {
                break;
            };
            self.apply(batch, index, outcome);
            publish(batch, index, observer);
        }

        if next < total {
            tracing::info!(batch_id = %batch.id, remaining = total - next, "Batch cancelled");
            for index in next..total {
                if let Some(task) = batch.task_mut(index) {
                    if let Err(e) = task.cancel() {
                        tracing::error!(error = %e, "Task transition rejected");
                        continue;
                    }
                }
                publish(batch, index, observer);
            }
        }

        let (completed_at, elapsed) = clock.finish();
        if let Err(e) = batch.mark_completed(completed_at) {
            tracing::error!(batch_id = %batch.id, error = %e, "Batch left unfinished tasks");
        }

        let result = BatchResult::from_batch(batch, clock.started_at(), completed_at, elapsed);
        tracing::info!(
            batch_id = %batch.id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            cancelled = result.cancelled.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch completed",
        );
        observer.on_batch_complete(&result);
        result
    }

    /// Generate the one output every task of a batch depends on.
    pub async fn run_prerequisite(&self, request: &GenerationRequest) -> Result<Media, PipelineError> {
        self.check_ready()?;
        self.submit(request).await.map_err(|e| {
            tracing::error!(error = %e, "Prerequisite generation failed");
            PipelineError::PrerequisiteFailed(e)
        })
    }

    /// Run a shared step first, then build and run the batch from its output.
    ///
    /// A failing shared step aborts before any task exists and surfaces as
    /// [`PipelineError::PrerequisiteFailed`].
    pub async fn run_with_prerequisite<F>(
        &self,
        request: &GenerationRequest,
        build: F,
        observer: &dyn BatchObserver,
    ) -> Result<(Batch, BatchResult), PipelineError>
    where
        F: FnOnce(Media) -> Result<Batch, BatchError>,
    {
        let output = self.run_prerequisite(request).await?;
        let mut batch = build(output)?;
        let result = self.run(&mut batch, observer).await;
        Ok((batch, result))
    }

    /// Generate a design from `seed`, then one mockup per target.
    pub async fn run_mockups(
        &self,
        seed: Seed,
        targets: Vec<Target>,
        observer: &dyn BatchObserver,
    ) -> Result<(Batch, BatchResult), PipelineError> {
        if !seed.has_design_input() {
            tracing::error!("Design seed has neither a prompt nor a reference image");
            return Err(PipelineError::PrerequisiteFailed(GenerationError::MissingAttachment(
                "design prompt or reference image".into(),
            )));
        }
        let request = seed.design_request();
        self.run_with_prerequisite(
            &request,
            |design| vitrine_core::create_batch(seed, targets, &Recipe::Mockup { design }),
            observer,
        )
        .await
    }

    // ---- private helpers ----

    async fn submit(&self, request: &GenerationRequest) -> Result<Media, GenerationError> {
        let outcome = match self.submit_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.client.submit(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GenerationError::Transport(format!(
                    "submission timed out after {}ms",
                    limit.as_millis()
                ))),
            },
            None => self.client.submit(request).await,
        };

        match outcome {
            Ok(media) if media.is_empty() => Err(GenerationError::EmptyResponse),
            other => other,
        }
    }

    fn apply(&self, batch: &mut Batch, index: usize, outcome: Result<Media, GenerationError>) {
        let Some(task) = batch.task_mut(index) else { return };
        let applied = match outcome {
            Ok(media) => {
                tracing::info!(target_id = %task.id(), bytes = media.payload.len(), "Task succeeded");
                task.succeed(media)
            }
            Err(reason) => {
                tracing::warn!(target_id = %task.id(), error = %reason, "Task failed");
                task.fail(reason)
            }
        };
        if let Err(e) = applied {
            tracing::error!(error = %e, "Task transition rejected");
        }
    }
}

/// Result of a batch that already ran, from its recorded timestamps.
fn recorded_result(batch: &Batch, clock: BatchClock) -> BatchResult {
    let (now, _) = clock.finish();
    let started_at = batch.started_at().unwrap_or(now);
    let completed_at = batch.completed_at().unwrap_or(now);
    let elapsed = (completed_at - started_at).to_std().unwrap_or(Duration::ZERO);
    BatchResult::from_batch(batch, started_at, completed_at, elapsed)
}

fn publish(batch: &Batch, index: usize, observer: &dyn BatchObserver) {
    if let Some(task) = batch.tasks().get(index) {
        observer.on_task_update(task, &batch.progress(index));
    }
}
