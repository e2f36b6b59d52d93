use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hygiene_core::constants::DOWNLOAD_SUFFIX;
use hygiene_core::RemediationTask;
use hygiene_storage::locator::base_name;
use hygiene_storage::Storage;

use crate::context::RemediationHandler;
use crate::transform::strip_quotes_file;

/// Downloads a rejected file, strips its quotes and uploads the result.
///
/// Each task works in its own scratch subdirectory, removed when the task ends
/// whether it succeeded or not.
pub struct HygieneWorker {
    storage: Arc<dyn Storage>,
    scratch_dir: PathBuf,
}

impl HygieneWorker {
    pub fn new(storage: Arc<dyn Storage>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            scratch_dir: scratch_dir.into(),
        }
    }

    async fn process(
        &self,
        task: &RemediationTask,
        workdir: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let file_name = base_name(&task.rejected_location);
        if file_name.is_empty() {
            bail!("Rejected location has no file name: {}", task.rejected_location);
        }
        let source = workdir.join(format!("{}{}", file_name, DOWNLOAD_SUFFIX));
        let target = workdir.join(file_name);

        self.storage
            .download(&task.rejected_location, &source)
            .await
            .with_context(|| format!("Failed to download {}", task.rejected_location))?;
        check_cancelled(cancel, "download")?;

        let (src, dst) = (source.clone(), target.clone());
        let records = tokio::task::spawn_blocking(move || strip_quotes_file(&src, &dst))
            .await
            .context("Quote stripping task failed")??;
        check_cancelled(cancel, "transform")?;

        self.storage
            .upload(&target, &task.destination_location)
            .await
            .with_context(|| format!("Failed to upload {}", task.destination_location))?;

        Ok(records)
    }
}

fn check_cancelled(cancel: &CancellationToken, stage: &str) -> Result<()> {
    if cancel.is_cancelled() {
        bail!("Remediation cancelled after {}", stage);
    }
    Ok(())
}

#[async_trait]
impl RemediationHandler for HygieneWorker {
    async fn remediate(&self, task: &RemediationTask, cancel: CancellationToken) -> Result<()> {
        check_cancelled(&cancel, "dispatch")?;

        let start = Instant::now();
        tracing::info!(task = %task.name, "Hygiene task started");

        let workdir = self.scratch_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&workdir)
            .await
            .with_context(|| format!("Failed to create scratch dir {}", workdir.display()))?;

        let result = self.process(task, &workdir, &cancel).await;

        if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
            tracing::warn!(
                error = %e,
                path = %workdir.display(),
                "Failed to clean up scratch dir"
            );
        }

        match result {
            Ok(records) => {
                tracing::info!(
                    task = %task.name,
                    destination = %task.destination_location,
                    records = records,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Hygiene task finished"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    task = %task.name,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Hygiene task failed"
                );
                Err(e)
            }
        }
    }
}
