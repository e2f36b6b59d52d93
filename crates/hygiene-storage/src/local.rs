use crate::locator::expand_user_dir;
use crate::traits::{Storage, StorageError, StorageObject, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

/// Local filesystem storage implementation
///
/// Paths are plain OS paths; a leading `~` is expanded to the home directory.
#[derive(Clone, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        LocalStorage
    }

    fn resolve(path: &str) -> PathBuf {
        PathBuf::from(expand_user_dir(path))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    async fn is_dir(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    fn to_object(path: &Path, meta: &Metadata) -> StorageObject {
        StorageObject {
            name: path.to_string_lossy().to_string(),
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            checksum: None,
            created: None,
        }
    }

    /// Run a blocking filesystem walk off the async runtime.
    async fn blocking<T, F>(f: F) -> StorageResult<T>
    where
        F: FnOnce() -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| StorageError::BackendError(format!("Filesystem task failed: {}", e)))?
    }
}

fn walk_files(root: &Path) -> StorageResult<(Vec<StorageObject>, u64)> {
    let mut objects = Vec::new();
    let mut size = 0u64;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| map_walk_error(root, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let meta = entry.metadata().map_err(|e| map_walk_error(root, e))?;
        size += meta.len();
        objects.push(LocalStorage::to_object(entry.path(), &meta));
    }
    Ok((objects, size))
}

fn copy_tree(from: &Path, to: &Path) -> StorageResult<u64> {
    let mut copied = 0u64;
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| map_walk_error(from, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(entry.path(), &target).map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to copy {} to {}: {}",
                entry.path().display(),
                target.display(),
                e
            ))
        })?;
        copied += 1;
    }
    Ok(copied)
}

fn map_walk_error(root: &Path, err: walkdir::Error) -> StorageError {
    let not_found = err
        .io_error()
        .map(|e| e.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false);
    if not_found {
        StorageError::NotFound(root.display().to_string())
    } else {
        StorageError::Io(err.into())
    }
}

fn map_read_dir_error(dir: &Path, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(dir.display().to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let file = Self::resolve(path);
        let start = std::time::Instant::now();

        if !fs::try_exists(&file).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let data = fs::read(&file).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", file.display(), e))
        })?;

        tracing::debug!(
            path = %file.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let file_path = Self::resolve(path);
        let size = data.len();
        let start = std::time::Instant::now();

        Self::ensure_parent_dir(&file_path).await?;

        let mut file = fs::File::create(&file_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %file_path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        let file = Self::resolve(path);

        if !fs::try_exists(&file).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&file).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", file.display(), e))
        })?;

        tracing::info!(path = %file.display(), "Local storage delete successful");
        Ok(())
    }

    async fn remove_dir(&self, path: &str) -> StorageResult<()> {
        let dir = Self::resolve(path);
        fs::remove_dir(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_string())
            } else {
                StorageError::DeleteFailed(format!(
                    "Failed to delete directory {}: {}",
                    dir.display(),
                    e
                ))
            }
        })
    }

    async fn remove_all(&self, path: &str) -> StorageResult<()> {
        let target = Self::resolve(path);

        if !fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(());
        }

        let result = if Self::is_dir(&target).await {
            fs::remove_dir_all(&target).await
        } else {
            fs::remove_file(&target).await
        };
        result.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete {}: {}", target.display(), e))
        })?;

        tracing::info!(path = %target.display(), "Local storage recursive delete successful");
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let from_path = Self::resolve(from);
        let to_path = Self::resolve(to);
        let start = std::time::Instant::now();

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from.to_string()));
        }

        if Self::is_dir(&from_path).await {
            let (src, dst) = (from_path.clone(), to_path.clone());
            let copied = Self::blocking(move || copy_tree(&src, &dst)).await?;
            tracing::info!(
                from = %from_path.display(),
                to = %to_path.display(),
                files = copied,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local storage directory copy successful"
            );
            return Ok(());
        }

        Self::ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to copy {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            from = %from_path.display(),
            to = %to_path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage copy successful"
        );

        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> StorageResult<()> {
        self.copy(from, to).await?;
        self.remove_all(from).await
    }

    async fn exists(&self, path: &str) -> bool {
        fs::try_exists(Self::resolve(path)).await.unwrap_or(false)
    }

    async fn list(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)> {
        let root = Self::resolve(dir);
        Self::blocking(move || walk_files(&root)).await
    }

    async fn list_children(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)> {
        let root = Self::resolve(dir);
        let mut entries = fs::read_dir(&root)
            .await
            .map_err(|e| map_read_dir_error(&root, e))?;

        let mut objects = Vec::new();
        let mut size = 0u64;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                continue;
            }
            size += meta.len();
            objects.push(Self::to_object(&root.join(entry.file_name()), &meta));
        }

        Ok((objects, size))
    }

    async fn list_subdirectories(&self, dir: &str) -> StorageResult<Vec<String>> {
        let root = Self::resolve(dir);
        let mut entries = fs::read_dir(&root)
            .await
            .map_err(|e| map_read_dir_error(&root, e))?;

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(root.join(entry.file_name()).to_string_lossy().to_string());
            }
        }

        Ok(dirs)
    }

    async fn download(&self, remote: &str, local: &Path) -> StorageResult<()> {
        self.copy(remote, &local.to_string_lossy()).await
    }

    async fn upload(&self, local: &Path, remote: &str) -> StorageResult<()> {
        self.copy(&local.to_string_lossy(), remote).await
    }

    fn join_path(&self, segments: &[&str]) -> String {
        let mut path = PathBuf::new();
        for segment in segments {
            path.push(segment);
        }
        path.to_string_lossy().to_string()
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn p(root: &Path, rel: &str) -> String {
        root.join(rel).to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip_creates_parents() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let path = p(dir.path(), "a/b/c/data.csv");

        storage.put(&path, b"x,y\n1,2\n".to_vec()).await.unwrap();

        assert_eq!(storage.get(&path).await.unwrap(), b"x,y\n1,2\n");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();

        let result = storage.get(&p(dir.path(), "missing.csv")).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();

        assert!(storage.remove(&p(dir.path(), "nope.txt")).await.is_ok());
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let path = p(dir.path(), "exists.txt");

        assert!(!storage.exists(&path).await);
        storage.put(&path, b"test".to_vec()).await.unwrap();
        assert!(storage.exists(&path).await);
    }

    #[tokio::test]
    async fn test_remove_dir_only_removes_empty_dirs() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        storage
            .put(&p(dir.path(), "full/f.txt"), b"1".to_vec())
            .await
            .unwrap();
        fs::create_dir_all(dir.path().join("empty")).await.unwrap();

        assert!(storage.remove_dir(&p(dir.path(), "full")).await.is_err());
        storage.remove_dir(&p(dir.path(), "empty")).await.unwrap();
        assert!(!storage.exists(&p(dir.path(), "empty")).await);
    }

    #[tokio::test]
    async fn test_remove_all_clears_every_descendant() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let root = p(dir.path(), "tree");
        for rel in ["tree/a.txt", "tree/d/b.txt", "tree/d/e/c.txt"] {
            storage.put(&p(dir.path(), rel), b"z".to_vec()).await.unwrap();
        }
        let (before, _) = storage.list(&root).await.unwrap();
        assert_eq!(before.len(), 3);

        storage.remove_all(&root).await.unwrap();

        for object in before {
            assert!(!storage.exists(&object.name).await);
        }
        assert!(!storage.exists(&root).await);
    }

    #[tokio::test]
    async fn test_list_recursive_and_children() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let root = p(dir.path(), "data");
        storage.put(&p(dir.path(), "data/x"), vec![0; 3]).await.unwrap();
        storage.put(&p(dir.path(), "data/xyz/y"), vec![0; 5]).await.unwrap();

        let (all, total) = storage.list(&root).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(total, 8);

        let (children, size) = storage.list_children(&root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, p(dir.path(), "data/x"));
        assert_eq!(size, 3);
        assert!(children[0].modified.is_some());
    }

    #[tokio::test]
    async fn test_list_subdirectories_is_stable() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let root = p(dir.path(), "reject");
        storage.put(&p(dir.path(), "reject/a/1.csv"), vec![1]).await.unwrap();
        storage.put(&p(dir.path(), "reject/b/2.csv"), vec![1]).await.unwrap();
        storage.put(&p(dir.path(), "reject/top.csv"), vec![1]).await.unwrap();

        let mut first = storage.list_subdirectories(&root).await.unwrap();
        let mut second = storage.list_subdirectories(&root).await.unwrap();
        first.sort();
        second.sort();
        assert_eq!(first, second);
        assert_eq!(first, vec![p(dir.path(), "reject/a"), p(dir.path(), "reject/b")]);
    }

    #[tokio::test]
    async fn test_listing_missing_dir_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let missing = p(dir.path(), "missing");

        assert!(matches!(
            storage.list(&missing).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.list_children(&missing).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_copy_directory_merges_into_destination() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let src = p(dir.path(), "src");
        let dest = p(dir.path(), "dest");
        storage.put(&p(dir.path(), "src/f1"), b"one".to_vec()).await.unwrap();
        storage.put(&p(dir.path(), "src/d/f2"), b"two".to_vec()).await.unwrap();

        storage.copy(&src, &dest).await.unwrap();
        assert_eq!(storage.get(&p(dir.path(), "dest/f1")).await.unwrap(), b"one");
        assert_eq!(storage.get(&p(dir.path(), "dest/d/f2")).await.unwrap(), b"two");

        storage.put(&p(dir.path(), "dest/keep"), b"keep".to_vec()).await.unwrap();
        storage.put(&p(dir.path(), "src/d2/f3"), b"three".to_vec()).await.unwrap();
        storage.copy(&src, &dest).await.unwrap();

        assert_eq!(storage.get(&p(dir.path(), "dest/d2/f3")).await.unwrap(), b"three");
        assert_eq!(storage.get(&p(dir.path(), "dest/keep")).await.unwrap(), b"keep");
        assert_eq!(storage.get(&p(dir.path(), "dest/f1")).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_move_deletes_source_after_copy() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let src = p(dir.path(), "src");
        storage.put(&p(dir.path(), "src/a/f"), b"moved".to_vec()).await.unwrap();

        storage.move_object(&src, &p(dir.path(), "dst")).await.unwrap();

        assert!(!storage.exists(&src).await);
        assert_eq!(storage.get(&p(dir.path(), "dst/a/f")).await.unwrap(), b"moved");
    }

    #[tokio::test]
    async fn test_move_missing_source_keeps_destination_untouched() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();

        let result = storage
            .move_object(&p(dir.path(), "ghost"), &p(dir.path(), "dst"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!storage.exists(&p(dir.path(), "dst")).await);
    }

    #[tokio::test]
    async fn test_download_and_upload_copy_files() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let remote = p(dir.path(), "remote/r.csv");
        storage.put(&remote, b"payload".to_vec()).await.unwrap();

        let local = dir.path().join("scratch/r.csv");
        storage.download(&remote, &local).await.unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"payload");

        let back = p(dir.path(), "remote/in/r.csv");
        storage.upload(&local, &back).await.unwrap();
        assert_eq!(storage.get(&back).await.unwrap(), b"payload");
    }

    #[test]
    fn test_join_path() {
        let storage = LocalStorage::new();
        assert_eq!(storage.join_path(&["/data", "721211", "reject"]), "/data/721211/reject");
    }
}
