//! Remediation handler trait
//!
//! The scanner holds an `Arc<dyn RemediationHandler>` and calls `remediate` once
//! per claimed file. [`crate::HygieneWorker`] is the production implementation.

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use hygiene_core::RemediationTask;

/// Performs the remediation of one rejected file.
#[async_trait]
pub trait RemediationHandler: Send + Sync {
    /// Remediate `task`, stopping early once `cancel` fires.
    async fn remediate(&self, task: &RemediationTask, cancel: CancellationToken) -> Result<()>;
}
