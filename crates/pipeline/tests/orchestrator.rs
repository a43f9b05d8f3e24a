//! Integration tests for the fan-out orchestrator against a scripted client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vitrine_core::{
    create_batch, BatchObserver, BatchProgress, BatchResult, BatchStatus, Callbacks, GenerationClient,
    GenerationError, GenerationRequest, ItemTask, Media, NoopObserver, Recipe, Seed, Target, TaskState,
};
use vitrine_events::EventBus;
use vitrine_pipeline::{ConcurrencyPolicy, FanOutOrchestrator, PipelineError};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Client that records every request and fails those whose instruction
/// contains a scripted needle.
#[derive(Default)]
struct ScriptedClient {
    calls: Mutex<Vec<GenerationRequest>>,
    failures: HashMap<String, GenerationError>,
    delay: Option<Duration>,
    unconfigured: bool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedClient {
    fn failing(mut self, needle: &str, error: GenerationError) -> Self {
        self.failures.insert(needle.to_string(), error);
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Media, GenerationError> {
        self.calls.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        for (needle, error) in &self.failures {
            if request.instruction.contains(needle.as_str()) {
                return Err(error.clone());
            }
        }
        Ok(Media::new("image/png", request.instruction.as_bytes().to_vec()))
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.unconfigured {
            Err(GenerationError::NotConfigured("no credential".into()))
        } else {
            Ok(())
        }
    }
}

/// Observer recording every update as `(target id, state label, completed)`.
#[derive(Default)]
struct Recorder {
    updates: Mutex<Vec<(String, &'static str, usize)>>,
    completions: AtomicUsize,
}

impl Recorder {
    fn updates(&self) -> Vec<(String, &'static str, usize)> {
        self.updates.lock().unwrap().clone()
    }
}

impl BatchObserver for Recorder {
    fn on_task_update(&self, task: &ItemTask, progress: &BatchProgress) {
        self.updates
            .lock()
            .unwrap()
            .push((task.id().to_string(), task.state().label(), progress.completed));
    }

    fn on_batch_complete(&self, _result: &BatchResult) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}

fn styles(ids: &[&str]) -> vitrine_core::Batch {
    let targets = ids.iter().map(|id| Target::new(*id, format!("style-{id}"))).collect();
    create_batch(Seed::new("coffee shop"), targets, &Recipe::StyledPreview).unwrap()
}

fn succeeded_ids(result: &BatchResult) -> Vec<&str> {
    result.succeeded.iter().map(|(t, _)| t.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Sequential behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn results_follow_target_order() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let mut batch = styles(&["a", "b", "c"]);

    let result = orchestrator.run(&mut batch, &NoopObserver).await;

    assert_eq!(succeeded_ids(&result), vec!["a", "b", "c"]);
    assert_eq!(client.call_count(), 3);
    assert_eq!(batch.status(), BatchStatus::Completed);
    assert!(batch.tasks().iter().all(|t| t.state().is_terminal()));
}

#[tokio::test]
async fn sequential_updates_start_and_finish_in_order() {
    let orchestrator = FanOutOrchestrator::new(Arc::new(ScriptedClient::default()));
    let recorder = Recorder::default();
    let mut batch = styles(&["a", "b"]);

    orchestrator.run(&mut batch, &recorder).await;

    assert_eq!(
        recorder.updates(),
        vec![
            ("a".to_string(), "Generating", 0),
            ("a".to_string(), "Succeeded", 1),
            ("b".to_string(), "Generating", 1),
            ("b".to_string(), "Succeeded", 2),
        ]
    );
    assert_eq!(recorder.completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn one_failure_does_not_affect_siblings() {
    let client = Arc::new(ScriptedClient::default().failing("style-b", GenerationError::NoMediaInResponse));
    let orchestrator = FanOutOrchestrator::new(client);
    let mut batch = styles(&["a", "b", "c"]);

    let result = orchestrator.run(&mut batch, &NoopObserver).await;

    assert_eq!(succeeded_ids(&result), vec!["a", "c"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0.id, "b");
    assert_eq!(result.failed[0].1, GenerationError::NoMediaInResponse);
    assert_matches!(
        batch.task("b").unwrap().state(),
        TaskState::Failed(GenerationError::NoMediaInResponse)
    );
}

#[tokio::test]
async fn timing_is_consistent() {
    let orchestrator = FanOutOrchestrator::new(Arc::new(ScriptedClient::default()));
    let mut batch = styles(&["a"]);

    let result = orchestrator.run(&mut batch, &NoopObserver).await;

    assert!(result.completed_at >= result.started_at);
    assert!(result.elapsed_secs() >= 0.0);
    assert_eq!(batch.started_at(), Some(result.started_at));
    assert_eq!(batch.completed_at(), Some(result.completed_at));
}

#[tokio::test]
async fn empty_batch_completes_immediately() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let recorder = Recorder::default();
    let mut batch = styles(&[]);

    let result = orchestrator.run(&mut batch, &recorder).await;

    assert_eq!(result.total(), 0);
    assert!(recorder.updates().is_empty());
    assert_eq!(recorder.completions.load(Ordering::SeqCst), 1);
    assert_eq!(client.call_count(), 0);
    assert_eq!(batch.status(), BatchStatus::Completed);
}

#[tokio::test]
async fn unresolved_tasks_fail_without_calling_client() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let design = Media::new("image/png", vec![9]);
    let targets = vec![
        Target::new("hoodie", "Hoodie").with_media(Media::new("image/png", vec![1])),
        Target::new("mug", "Mug"),
    ];
    let mut batch = create_batch(Seed::new("cat"), targets, &Recipe::Mockup { design }).unwrap();

    let result = orchestrator.run(&mut batch, &NoopObserver).await;

    assert_eq!(client.call_count(), 1);
    assert_eq!(succeeded_ids(&result), vec!["hoodie"]);
    assert_matches!(&result.failed[0].1, GenerationError::MissingAttachment(_));
}

// ---------------------------------------------------------------------------
// Prerequisite step
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mockup_scenario_runs_design_then_one_mockup_per_product() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let hoodie = Media::new("image/jpeg", vec![1, 1]);
    let mug = Media::new("image/jpeg", vec![2, 2]);
    let targets = vec![
        Target::new("hoodie", "Hoodie").with_media(hoodie.clone()),
        Target::new("mug", "Mug").with_media(mug.clone()),
    ];

    let (batch, result) = orchestrator
        .run_mockups(Seed::new("a cat astronaut"), targets, &NoopObserver)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].instruction.contains("a cat astronaut"));
    assert!(calls[0].attachments.is_empty());

    let design = Media::new("image/png", calls[0].instruction.as_bytes().to_vec());
    assert_eq!(calls[1].attachments, vec![design.clone(), hoodie]);
    assert!(calls[1].instruction.contains("Hoodie"));
    assert_eq!(calls[2].attachments, vec![design, mug]);

    assert_eq!(succeeded_ids(&result), vec!["hoodie", "mug"]);
    assert!(result.failed.is_empty());
    assert_eq!(batch.status(), BatchStatus::Completed);
}

#[tokio::test]
async fn mug_transport_failure_leaves_hoodie_succeeded() {
    let client = Arc::new(ScriptedClient::default().failing("Mug", GenerationError::Transport("reset".into())));
    let orchestrator = FanOutOrchestrator::new(client);
    let png = Media::new("image/png", vec![0x89, b'P', b'N', b'G']);
    let targets = vec![
        Target::new("hoodie", "Hoodie").with_media(png.clone()),
        Target::new("mug", "Mug").with_media(png),
    ];

    let (batch, result) = orchestrator
        .run_mockups(Seed::new("geometric sunset pattern"), targets, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(succeeded_ids(&result), vec!["hoodie"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0.id, "mug");
    assert_matches!(&result.failed[0].1, GenerationError::Transport(_));
    assert_eq!(batch.status(), BatchStatus::Completed);
}

#[tokio::test]
async fn unconfigured_client_fails_before_any_work() {
    let client = Arc::new(ScriptedClient {
        unconfigured: true,
        ..Default::default()
    });
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let recorder = Recorder::default();

    let outcome = orchestrator
        .run_mockups(Seed::new("cat"), vec![Target::new("mug", "Mug")], &recorder)
        .await;

    assert_matches!(
        outcome,
        Err(PipelineError::PrerequisiteFailed(GenerationError::NotConfigured(_)))
    );
    assert_eq!(client.call_count(), 0);
    assert!(recorder.updates().is_empty());
    assert_eq!(recorder.completions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn text_only_design_aborts_the_batch() {
    let client = Arc::new(ScriptedClient::default().failing("print-ready", GenerationError::NoMediaInResponse));
    let orchestrator = FanOutOrchestrator::new(client.clone());

    let outcome = orchestrator
        .run_mockups(Seed::new("cat"), vec![Target::new("mug", "Mug")], &NoopObserver)
        .await;

    assert_matches!(
        outcome,
        Err(PipelineError::PrerequisiteFailed(GenerationError::NoMediaInResponse))
    );
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn blank_seed_without_reference_never_submits() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let recorder = Recorder::default();

    let outcome = orchestrator
        .run_mockups(Seed::new("  "), vec![Target::new("mug", "Mug")], &recorder)
        .await;

    assert_matches!(
        outcome,
        Err(PipelineError::PrerequisiteFailed(GenerationError::MissingAttachment(_)))
    );
    assert_eq!(client.call_count(), 0);
    assert!(recorder.updates().is_empty());
}

#[tokio::test]
async fn reference_alone_is_enough_for_a_design() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let reference = Media::new("image/png", vec![7]);
    let seed = Seed::new("").with_reference(reference.clone());

    let (_, result) = orchestrator
        .run_mockups(seed, vec![Target::new("mug", "Mug").with_media(reference.clone())], &NoopObserver)
        .await
        .unwrap();

    assert_eq!(client.calls()[0].attachments, vec![reference]);
    assert_eq!(succeeded_ids(&result), vec!["mug"]);
}

#[tokio::test]
async fn invalid_targets_surface_after_prerequisite() {
    let orchestrator = FanOutOrchestrator::new(Arc::new(ScriptedClient::default()));
    let targets = vec![Target::new("mug", "Mug"), Target::new("mug", "Mug 2")];

    let outcome = orchestrator
        .run_mockups(Seed::new("cat"), targets, &NoopObserver)
        .await;

    assert_matches!(outcome, Err(PipelineError::InvalidBatch(_)));
}

// ---------------------------------------------------------------------------
// Concurrency, cancellation and timeouts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn bounded_policy_caps_in_flight_submissions() {
    let client = Arc::new(ScriptedClient::default().delayed(Duration::from_millis(100)));
    let policy = ConcurrencyPolicy::from_max_concurrent(2);
    let orchestrator = FanOutOrchestrator::new(client.clone()).with_policy(policy);
    let mut batch = styles(&["a", "b", "c", "d", "e"]);

    let result = orchestrator.run(&mut batch, &NoopObserver).await;

    assert_eq!(client.peak.load(Ordering::SeqCst), 2);
    assert_eq!(client.call_count(), 5);
    assert_eq!(succeeded_ids(&result), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test(start_paused = true)]
async fn sequential_policy_never_overlaps() {
    let client = Arc::new(ScriptedClient::default().delayed(Duration::from_millis(50)));
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let mut batch = styles(&["a", "b", "c"]);

    orchestrator.run(&mut batch, &NoopObserver).await;

    assert_eq!(client.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_stops_unstarted_tasks() {
    let client = Arc::new(ScriptedClient::default());
    let cancel = CancellationToken::new();
    let orchestrator = FanOutOrchestrator::new(client.clone());

    let token = cancel.clone();
    let observer = Callbacks::new(
        move |task: &ItemTask, _: &BatchProgress| {
            if task.state().is_terminal() {
                token.cancel();
            }
        },
        |_: &BatchResult| {},
    );
    let mut batch = styles(&["a", "b", "c"]);

    let result = orchestrator.run_until_cancelled(&mut batch, &observer, &cancel).await;

    assert_eq!(client.call_count(), 1);
    assert_eq!(succeeded_ids(&result), vec!["a"]);
    let cancelled: Vec<&str> = result.cancelled.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(cancelled, vec!["b", "c"]);
    assert!(result.was_cancelled());
    assert_eq!(batch.status(), BatchStatus::Completed);
    assert_eq!(batch.task("c").unwrap().state(), &TaskState::Cancelled);
}

#[tokio::test]
async fn cancelled_token_only_affects_its_own_run() {
    let client = Arc::new(ScriptedClient::default());
    let orchestrator = FanOutOrchestrator::new(client.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut stopped = styles(&["a"]);
    let first = orchestrator.run_until_cancelled(&mut stopped, &NoopObserver, &cancel).await;
    assert_eq!(first.cancelled.len(), 1);
    assert_eq!(client.call_count(), 0);

    let mut next = styles(&["b", "c"]);
    let second = orchestrator.run(&mut next, &NoopObserver).await;

    assert_eq!(client.call_count(), 2);
    assert_eq!(succeeded_ids(&second), vec!["b", "c"]);
    assert!(!second.was_cancelled());
}

#[tokio::test(start_paused = true)]
async fn slow_submission_times_out_as_transport_failure() {
    let client = Arc::new(ScriptedClient::default().delayed(Duration::from_secs(30)));
    let orchestrator = FanOutOrchestrator::new(client).with_submit_timeout(Duration::from_millis(500));
    let mut batch = styles(&["a"]);

    let result = orchestrator.run(&mut batch, &NoopObserver).await;

    assert_matches!(&result.failed[0].1, GenerationError::Transport(msg) if msg.contains("timed out"));
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bus_observer_publishes_updates_then_completion() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let orchestrator = FanOutOrchestrator::new(Arc::new(ScriptedClient::default()));
    let mut batch = styles(&["a", "b"]);
    let batch_id = batch.id;

    orchestrator.run(&mut batch, &bus.observer(batch_id)).await;

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.batch_id(), batch_id);
        kinds.push(event.event_type());
    }
    assert_eq!(
        kinds,
        vec!["task.updated", "task.updated", "task.updated", "task.updated", "batch.completed"]
    );
}
