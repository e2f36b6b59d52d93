//! Worker and scanner initialization

use anyhow::Result;
use hygiene_core::Config;
use hygiene_services::{HygieneWorker, RejectedFileScanner, ScannerConfig, Storage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Build the remediation worker and the (not yet started) scanner.
pub fn initialize_services(config: &Config, storage: Arc<dyn Storage>) -> Result<Arc<AppState>> {
    let worker = Arc::new(HygieneWorker::new(
        storage.clone(),
        config.scratch_dir().clone(),
    ));
    tracing::info!(scratch_dir = %config.scratch_dir().display(), "Remediation worker initialized");

    let scanner = Arc::new(RejectedFileScanner::new(
        storage,
        worker,
        ScannerConfig::from(&config.scan),
    ));

    Ok(Arc::new(AppState {
        scanner,
        shutdown: CancellationToken::new(),
    }))
}
