//! Start-up wiring tests: state construction and scanner lifecycle.

use std::sync::Arc;
use std::time::Duration;

use hygiene_api::setup::services::initialize_services;
use hygiene_core::Config;
use hygiene_services::{ScanError, ScannerPhase, Storage};
use hygiene_storage::{GcsStorage, MemoryConnector};

fn config(scratch: &std::path::Path) -> Config {
    let scratch = scratch.to_string_lossy().to_string();
    Config::from_lookup(move |key| match key {
        "STORAGE_ROOT" => Some("gs://bucket".to_string()),
        "SCAN_INTERVAL_SECS" => Some("1".to_string()),
        "SCRATCH_DIR" => Some(scratch.clone()),
        _ => None,
    })
    .unwrap()
}

#[tokio::test]
async fn test_scanner_runs_until_shutdown() {
    let scratch = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(GcsStorage::new(Arc::new(MemoryConnector::new())));
    let state = initialize_services(&config(scratch.path()), storage).unwrap();
    assert_eq!(state.scanner.phase(), ScannerPhase::Idle);

    let handle = state.scanner.clone().start(state.shutdown.clone()).unwrap();
    assert_eq!(
        state.scanner.clone().start(state.shutdown.clone()).unwrap_err(),
        ScanError::AlreadyRunning
    );

    state.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.scanner.phase(), ScannerPhase::Stopped);
}

#[tokio::test]
async fn test_scanner_remediates_through_worker() {
    let scratch = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(GcsStorage::new(Arc::new(MemoryConnector::new())));
    storage
        .put(
            "gs://bucket/721211/reject/batch/r.csv",
            b"\"id\",\"v\"\n\"1\",\"a\"\n".to_vec(),
        )
        .await
        .unwrap();
    let state = initialize_services(&config(scratch.path()), storage.clone()).unwrap();

    let summary = state
        .scanner
        .scan(&mut hygiene_services::ScannerState::default())
        .await;

    assert_eq!(summary.dispatched, 1);
    assert_eq!(
        storage.get("gs://bucket/721211/in/batch/r.csv").await.unwrap(),
        b"id,v\n1,a\n"
    );
    assert!(storage.exists("gs://bucket/721211/reject/batch/r.csv.scanned").await);
}
