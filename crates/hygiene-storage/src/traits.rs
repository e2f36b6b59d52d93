//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Illegal file path: {0}")]
    IllegalPath(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of a listing result.
///
/// A snapshot taken at listing time; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    /// Full path of the object, including the `gs://` scheme for cloud objects.
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Content checksum reported by the backend, if any.
    pub checksum: Option<String>,
    /// Creation time. Only cloud backends that report it fill this in.
    pub created: Option<DateTime<Utc>>,
}

/// Storage abstraction trait
///
/// Both backends (local filesystem, Google Cloud Storage) implement this trait, and
/// so does [`crate::StorageFacade`], which routes each call to one of them. Callers
/// never branch on the backend type.
///
/// Directory-like operations (`copy`, `move_object`, `remove_all`, the listings)
/// act on every descendant of the given path. On the cloud backend a "directory"
/// is every key sharing the path's prefix.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a whole object.
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Write a whole object, creating intermediate directories where the backend has them.
    async fn put(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Delete a single object. Deleting an absent object succeeds.
    async fn remove(&self, path: &str) -> StorageResult<()>;

    /// Delete an empty directory.
    async fn remove_dir(&self, path: &str) -> StorageResult<()>;

    /// Delete a directory and everything below it.
    async fn remove_all(&self, path: &str) -> StorageResult<()>;

    /// Copy an object, or a directory with all of its descendants.
    ///
    /// Existing destination content is merged with, not replaced by, the copy.
    /// A failure partway leaves already-copied children in place.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Copy, then delete the source. The source is kept if the copy fails.
    async fn move_object(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Whether `path` exists.
    ///
    /// Never fails: any error, including permission errors, reads as `false`.
    async fn exists(&self, path: &str) -> bool;

    /// Every leaf object below `dir`, recursively, with their total size.
    async fn list(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)>;

    /// Leaf objects directly inside `dir`, with their total size.
    async fn list_children(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)>;

    /// Full paths of the directories directly inside `dir`.
    async fn list_subdirectories(&self, dir: &str) -> StorageResult<Vec<String>>;

    /// Fetch a remote object into a local file.
    async fn download(&self, remote: &str, local: &Path) -> StorageResult<()>;

    /// Store a local file as a remote object.
    async fn upload(&self, local: &Path, remote: &str) -> StorageResult<()>;

    /// Join path segments the way this backend spells paths.
    fn join_path(&self, segments: &[&str]) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
