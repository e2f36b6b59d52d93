//! Hygiene Storage Library
//!
//! This crate provides one storage contract, the [`Storage`] trait, and two
//! implementations of it: the local filesystem and Google Cloud Storage.
//!
//! # Paths
//!
//! Every operation takes a full path. Paths starting with `gs://` address the
//! cloud object store as `gs://{bucket}/{key}`; anything else is a local
//! filesystem path. Object stores have no real directories, so the cloud
//! backend emulates them with key prefixes that always end in `/`.
//!
//! [`StorageFacade`] picks the backend for each call from the path's scheme, so
//! one value can address both backends in the same request cycle.

pub mod facade;
pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod locator;
pub mod traits;

// Re-export commonly used types
pub use facade::StorageFacade;
pub use factory::create_storage;
#[cfg(feature = "storage-gcs")]
pub use gcs::{BucketConnector, GcsConnector, GcsStorage, MemoryConnector};
pub use hygiene_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use locator::ObjectLocator;
pub use traits::{Storage, StorageError, StorageObject, StorageResult};
