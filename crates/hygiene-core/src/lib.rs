//! Hygiene Core Library
//!
//! This crate provides the configuration, shared constants, domain models and the
//! storage backend identity used by every other Hygiene crate.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, GcsCredentials, MarkerPolicy, ScanSettings};
pub use models::RemediationTask;
pub use storage_types::StorageBackend;
