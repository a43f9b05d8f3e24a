mod manifest;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_core::{Batch, GenerationError, Recipe, RemoteFetcher};
use vitrine_events::{BatchEvent, EventBus};
use vitrine_generation::{GenerationConfig, HttpFetcher, HttpGenerationClient};
use vitrine_pipeline::{prepare_batch, prepare_seed, ConcurrencyPolicy, FanOutOrchestrator, PipelineError};

use manifest::{Manifest, Plan};

const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine_worker=debug,vitrine_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = GenerationConfig::from_env().context("invalid generation configuration")?;
    let manifest_path = std::env::var("BATCH_MANIFEST").context("BATCH_MANIFEST must be set")?;
    let output_dir = PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into()));
    tracing::info!(
        ?config,
        manifest = %manifest_path,
        output_dir = %output_dir.display(),
        "Loaded worker configuration",
    );

    let manifest = Manifest::load(&manifest_path).await?;

    // --- Orchestrator ---
    let policy = ConcurrencyPolicy::from_max_concurrent(config.max_concurrent_submissions);
    let submit_timeout = config.timeout();
    let client = Arc::new(HttpGenerationClient::new(config)?);
    let orchestrator = FanOutOrchestrator::new(client)
        .with_policy(policy)
        .with_submit_timeout(submit_timeout);
    orchestrator.check_ready()?;

    // Ctrl-C stops tasks that have not started; in-flight ones finish.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling remaining tasks");
            interrupt.cancel();
        }
    });

    // --- Event bus ---
    let event_bus = EventBus::default();
    let progress_handle = tokio::spawn(log_progress(event_bus.subscribe()));

    // --- Batch ---
    let fetcher = HttpFetcher::new();
    let mut batch = build_batch(&orchestrator, &fetcher, manifest).await?;
    let observer = event_bus.observer(batch.id);
    let result = orchestrator
        .run_until_cancelled(&mut batch, &observer, &cancel)
        .await;

    // Dropping the bus closes the channel and ends the progress logger.
    drop(observer);
    drop(event_bus);
    if let Err(e) = progress_handle.await {
        tracing::warn!(error = %e, "Progress logger ended abnormally");
    }

    // --- Output ---
    let summary = output::write_artifacts(&output_dir, &result)
        .await
        .with_context(|| format!("failed to write artifacts to {}", output_dir.display()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Resolve the manifest into a runnable batch, running the shared step
/// first when the plan needs one.
async fn build_batch(
    orchestrator: &FanOutOrchestrator,
    fetcher: &dyn RemoteFetcher,
    manifest: Manifest,
) -> Result<Batch, PipelineError> {
    let seed = prepare_seed(&manifest.seed, fetcher).await?;

    let recipe = match manifest.plan {
        Plan::Mockup => {
            if !seed.has_design_input() {
                return Err(PipelineError::PrerequisiteFailed(GenerationError::MissingAttachment(
                    "design prompt or reference image".into(),
                )));
            }
            let design = orchestrator.run_prerequisite(&seed.design_request()).await?;
            Recipe::Mockup { design }
        }
        Plan::Perspective {
            subject,
            subject_label,
        } => {
            let subject = subject
                .resolve(fetcher)
                .await
                .map_err(|e| PipelineError::PrerequisiteFailed(e.into()))?;
            Recipe::Perspective {
                subject,
                subject_label,
            }
        }
        Plan::CompositeIntoScene => Recipe::CompositeIntoScene,
        Plan::StyledPreview => Recipe::StyledPreview,
    };

    tracing::info!(recipe = recipe.name(), targets = manifest.targets.len(), "Preparing batch");
    Ok(prepare_batch(seed, manifest.targets, &recipe, fetcher).await?)
}

async fn log_progress(mut rx: broadcast::Receiver<BatchEvent>) {
    loop {
        match rx.recv().await {
            Ok(BatchEvent::TaskUpdated { task, progress, .. }) => {
                tracing::info!(
                    target_id = %task.id(),
                    state = task.state().label(),
                    completed = progress.completed,
                    total = progress.total,
                    percent = progress.percent(),
                    "Task update",
                );
            }
            Ok(BatchEvent::BatchCompleted { result }) => {
                tracing::info!(
                    batch_id = %result.batch_id,
                    succeeded = result.succeeded.len(),
                    failed = result.failed.len(),
                    cancelled = result.cancelled.len(),
                    elapsed_secs = result.elapsed_secs(),
                    "Batch finished",
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Progress logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
