//! Hygiene Services Layer
//!
//! Hosts the rejected file scanner and re-exports the storage and worker APIs so
//! the API crate depends on a single service facade.

pub mod scan;

pub use hygiene_storage::{
    create_storage, Storage, StorageBackend, StorageError, StorageObject, StorageResult,
};
pub use hygiene_worker::{HygieneWorker, RemediationHandler};
pub use scan::{
    RejectedFileScanner, ScanError, ScanSummary, ScannerConfig, ScannerPhase, ScannerState,
};
