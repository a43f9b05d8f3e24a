//! Persisting batch artifacts and the run summary.

use std::path::{Path, PathBuf};

use serde::Serialize;
use vitrine_core::BatchResult;

/// Compact, payload-free view of a [`BatchResult`] printed on stdout.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub batch_id: String,
    pub elapsed_secs: f64,
    pub succeeded: Vec<WrittenArtifact>,
    pub failed: Vec<FailedTarget>,
    pub cancelled: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WrittenArtifact {
    pub id: String,
    pub path: PathBuf,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct FailedTarget {
    pub id: String,
    pub code: &'static str,
    pub reason: String,
}

/// Write every succeeded artifact to `dir/<target id>.<ext>`.
pub async fn write_artifacts(dir: &Path, result: &BatchResult) -> std::io::Result<RunSummary> {
    tokio::fs::create_dir_all(dir).await?;

    let mut succeeded = Vec::with_capacity(result.succeeded.len());
    for (target, media) in &result.succeeded {
        let path = dir.join(format!("{}.{}", file_stem(&target.id), media.extension()));
        tokio::fs::write(&path, &media.payload).await?;
        tracing::debug!(target_id = %target.id, path = %path.display(), "Artifact written");
        succeeded.push(WrittenArtifact {
            id: target.id.clone(),
            path,
            mime_type: media.mime_type.clone(),
        });
    }

    Ok(RunSummary {
        batch_id: result.batch_id.to_string(),
        elapsed_secs: result.elapsed_secs(),
        succeeded,
        failed: result
            .failed
            .iter()
            .map(|(target, error)| FailedTarget {
                id: target.id.clone(),
                code: error.code(),
                reason: error.to_string(),
            })
            .collect(),
        cancelled: result.cancelled.iter().map(|t| t.id.clone()).collect(),
    })
}

/// Target ids are free-form; keep file names to a safe alphabet.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use vitrine_core::{GenerationError, Media, Target};

    use super::*;

    fn result() -> BatchResult {
        let now = Utc::now();
        BatchResult {
            batch_id: uuid::Uuid::new_v4(),
            started_at: now,
            completed_at: now,
            elapsed: Duration::from_millis(1500),
            succeeded: vec![(Target::new("mug", "Mug"), Media::new("image/png", vec![1, 2, 3]))],
            failed: vec![(Target::new("cap", "Cap"), GenerationError::NoMediaInResponse)],
            cancelled: vec![Target::new("tote", "Tote")],
        }
    }

    #[tokio::test]
    async fn writes_one_file_per_success() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");

        let summary = write_artifacts(&out, &result()).await.unwrap();

        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.succeeded[0].path, out.join("mug.png"));
        assert_eq!(tokio::fs::read(out.join("mug.png")).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(summary.failed[0].code, GenerationError::NoMediaInResponse.code());
        assert_eq!(summary.cancelled, vec!["tote".to_string()]);
        assert_eq!(summary.elapsed_secs, 1.5);
    }

    #[test]
    fn file_stem_replaces_path_separators() {
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_stem("mug-v2_large"), "mug-v2_large");
    }
}
