//! Per-call routing between the local and cloud backends.

use crate::locator::{append_path_suffix, base_name, expand_user_dir};
use crate::traits::{Storage, StorageError, StorageObject, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A [`Storage`] that forwards every call to the backend owning its path.
///
/// `gs://` paths go to the cloud backend, everything else to the local one.
/// `download` and `upload` route by their remote path. A `copy` or `move_object`
/// whose endpoints live on different backends becomes an upload or download on
/// the cloud side.
#[derive(Clone)]
pub struct StorageFacade {
    local: Option<Arc<dyn Storage>>,
    cloud: Option<Arc<dyn Storage>>,
}

impl StorageFacade {
    pub fn new(local: Option<Arc<dyn Storage>>, cloud: Option<Arc<dyn Storage>>) -> Self {
        Self { local, cloud }
    }

    fn backend(&self, kind: StorageBackend) -> StorageResult<&Arc<dyn Storage>> {
        let backend = match kind {
            StorageBackend::Local => self.local.as_ref(),
            StorageBackend::Gcs => self.cloud.as_ref(),
        };
        backend.ok_or_else(|| {
            StorageError::ConfigError(format!("{} storage backend not configured", kind))
        })
    }

    fn route(&self, path: &str) -> StorageResult<&Arc<dyn Storage>> {
        self.backend(StorageBackend::for_path(path))
    }

    /// Copy between backends through the cloud side's download/upload.
    ///
    /// A directory-like source is copied file by file, keeping each file's path
    /// relative to the source.
    async fn transfer(&self, from: &str, to: &str) -> StorageResult<()> {
        if StorageBackend::for_path(from) == StorageBackend::Gcs {
            self.transfer_down(from, to).await
        } else {
            self.transfer_up(from, to).await
        }
    }

    async fn transfer_down(&self, from: &str, to: &str) -> StorageResult<()> {
        let cloud = self.backend(StorageBackend::Gcs)?;
        if cloud.exists(from).await {
            return cloud.download(from, Path::new(to)).await;
        }

        let (objects, _) = cloud.list(from).await?;
        if objects.is_empty() {
            return Err(StorageError::NotFound(from.to_string()));
        }

        let src_dir = append_path_suffix(&cloud.join_path(&[from]));
        let dest = PathBuf::from(expand_user_dir(to));
        for object in &objects {
            let relative = object
                .name
                .strip_prefix(src_dir.as_str())
                .unwrap_or_else(|| base_name(&object.name));
            cloud.download(&object.name, &dest.join(relative)).await?;
        }

        tracing::info!(
            from = %from,
            to = %to,
            objects = objects.len(),
            "Directory downloaded across backends"
        );
        Ok(())
    }

    async fn transfer_up(&self, from: &str, to: &str) -> StorageResult<()> {
        let cloud = self.backend(StorageBackend::Gcs)?;
        let source = PathBuf::from(expand_user_dir(from));
        let is_dir = tokio::fs::metadata(&source)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return cloud.upload(&source, to).await;
        }

        let (objects, _) = self.backend(StorageBackend::Local)?.list(from).await?;
        for object in &objects {
            let file = Path::new(&object.name);
            let relative = file
                .strip_prefix(&source)
                .map_err(|e| StorageError::BackendError(e.to_string()))?;
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            let mut parts: Vec<&str> = vec![to];
            parts.extend(segments.iter().map(String::as_str));
            cloud.upload(file, &cloud.join_path(&parts)).await?;
        }

        tracing::info!(
            from = %from,
            to = %to,
            objects = objects.len(),
            "Directory uploaded across backends"
        );
        Ok(())
    }

    fn crosses_backends(from: &str, to: &str) -> bool {
        StorageBackend::for_path(from) != StorageBackend::for_path(to)
    }
}

#[async_trait]
impl Storage for StorageFacade {
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.route(path)?.get(path).await
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.route(path)?.put(path, data).await
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        self.route(path)?.remove(path).await
    }

    async fn remove_dir(&self, path: &str) -> StorageResult<()> {
        self.route(path)?.remove_dir(path).await
    }

    async fn remove_all(&self, path: &str) -> StorageResult<()> {
        self.route(path)?.remove_all(path).await
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        if Self::crosses_backends(from, to) {
            return self.transfer(from, to).await;
        }
        self.route(from)?.copy(from, to).await
    }

    async fn move_object(&self, from: &str, to: &str) -> StorageResult<()> {
        if Self::crosses_backends(from, to) {
            self.transfer(from, to).await?;
            return self.route(from)?.remove_all(from).await;
        }
        self.route(from)?.move_object(from, to).await
    }

    async fn exists(&self, path: &str) -> bool {
        match self.route(path) {
            Ok(backend) => backend.exists(path).await,
            Err(_) => false,
        }
    }

    async fn list(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)> {
        self.route(dir)?.list(dir).await
    }

    async fn list_children(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)> {
        self.route(dir)?.list_children(dir).await
    }

    async fn list_subdirectories(&self, dir: &str) -> StorageResult<Vec<String>> {
        self.route(dir)?.list_subdirectories(dir).await
    }

    async fn download(&self, remote: &str, local: &Path) -> StorageResult<()> {
        self.route(remote)?.download(remote, local).await
    }

    async fn upload(&self, local: &Path, remote: &str) -> StorageResult<()> {
        self.route(remote)?.upload(local, remote).await
    }

    fn join_path(&self, segments: &[&str]) -> String {
        let first = segments.first().copied().unwrap_or_default();
        match self.route(first) {
            Ok(backend) => backend.join_path(segments),
            Err(_) => segments.join("/"),
        }
    }

    /// The backend used for paths without a scheme.
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-gcs", feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::{GcsStorage, LocalStorage, MemoryConnector};
    use tempfile::tempdir;

    fn facade() -> StorageFacade {
        StorageFacade::new(
            Some(Arc::new(LocalStorage::new())),
            Some(Arc::new(GcsStorage::new(Arc::new(MemoryConnector::new())))),
        )
    }

    #[tokio::test]
    async fn test_routes_by_scheme() {
        let dir = tempdir().unwrap();
        let storage = facade();
        let local = dir.path().join("a.txt").to_string_lossy().to_string();

        storage.put(&local, b"local".to_vec()).await.unwrap();
        storage.put("gs://bucket/a.txt", b"cloud".to_vec()).await.unwrap();

        assert_eq!(storage.get(&local).await.unwrap(), b"local");
        assert_eq!(storage.get("gs://bucket/a.txt").await.unwrap(), b"cloud");
        assert!(std::fs::metadata(dir.path().join("a.txt")).is_ok());
    }

    #[tokio::test]
    async fn test_missing_cloud_backend_is_config_error() {
        let storage = StorageFacade::new(Some(Arc::new(LocalStorage::new())), None);

        let result = storage.get("gs://bucket/a.txt").await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
        assert!(!storage.exists("gs://bucket/a.txt").await);
    }

    #[tokio::test]
    async fn test_download_and_upload_route_by_remote_path() {
        let dir = tempdir().unwrap();
        let storage = facade();
        storage.put("gs://bucket/r/x.csv", b"x".to_vec()).await.unwrap();

        let scratch = dir.path().join("x.csv");
        storage.download("gs://bucket/r/x.csv", &scratch).await.unwrap();
        storage.upload(&scratch, "gs://bucket/i/x.csv").await.unwrap();

        assert_eq!(storage.get("gs://bucket/i/x.csv").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_copy_across_backends() {
        let dir = tempdir().unwrap();
        let storage = facade();
        let local = dir.path().join("up.csv").to_string_lossy().to_string();
        storage.put(&local, b"up".to_vec()).await.unwrap();

        storage.move_object(&local, "gs://bucket/up.csv").await.unwrap();

        assert_eq!(storage.get("gs://bucket/up.csv").await.unwrap(), b"up");
        assert!(!storage.exists(&local).await);
    }

    #[tokio::test]
    async fn test_copy_cloud_directory_to_local() {
        let dir = tempdir().unwrap();
        let storage = facade();
        storage.put("gs://bucket/src/f1", b"1".to_vec()).await.unwrap();
        storage.put("gs://bucket/src/d/f2", b"2".to_vec()).await.unwrap();
        let dest = dir.path().join("dest");

        storage
            .copy("gs://bucket/src", &dest.to_string_lossy())
            .await
            .unwrap();

        assert_eq!(std::fs::read(dest.join("f1")).unwrap(), b"1");
        assert_eq!(std::fs::read(dest.join("d/f2")).unwrap(), b"2");
        assert!(storage.exists("gs://bucket/src/f1").await);
    }

    #[tokio::test]
    async fn test_copy_local_directory_to_cloud() {
        let dir = tempdir().unwrap();
        let storage = facade();
        let src = dir.path().join("lsrc");
        std::fs::create_dir_all(src.join("d")).unwrap();
        std::fs::write(src.join("f1"), b"1").unwrap();
        std::fs::write(src.join("d/f2"), b"2").unwrap();

        storage
            .copy(&src.to_string_lossy(), "gs://bucket/up")
            .await
            .unwrap();

        assert_eq!(storage.get("gs://bucket/up/f1").await.unwrap(), b"1");
        assert_eq!(storage.get("gs://bucket/up/d/f2").await.unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_move_cloud_directory_to_local_removes_source() {
        let dir = tempdir().unwrap();
        let storage = facade();
        storage.put("gs://bucket/mv/a", b"a".to_vec()).await.unwrap();
        storage.put("gs://bucket/mv/b/c", b"c".to_vec()).await.unwrap();
        let dest = dir.path().join("moved");

        storage
            .move_object("gs://bucket/mv", &dest.to_string_lossy())
            .await
            .unwrap();

        assert_eq!(std::fs::read(dest.join("b/c")).unwrap(), b"c");
        assert!(!storage.exists("gs://bucket/mv/a").await);
        assert!(!storage.exists("gs://bucket/mv/b/c").await);
    }

    #[tokio::test]
    async fn test_failed_cross_backend_move_keeps_source() {
        let dir = tempdir().unwrap();
        let storage = facade();
        storage.put("gs://bucket/keep/a", b"a".to_vec()).await.unwrap();
        storage.put("gs://bucket/keep/b/c", b"c".to_vec()).await.unwrap();
        // A regular file where the destination directory should go.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let result = storage
            .move_object("gs://bucket/keep", &blocker.to_string_lossy())
            .await;

        assert!(result.is_err());
        assert!(storage.exists("gs://bucket/keep/a").await);
        assert!(storage.exists("gs://bucket/keep/b/c").await);
    }

    #[tokio::test]
    async fn test_copy_missing_cloud_source_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = facade();

        let result = storage
            .copy("gs://bucket/ghost", &dir.path().join("g").to_string_lossy())
            .await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_join_path_routes_by_first_segment() {
        let storage = facade();
        assert_eq!(
            storage.join_path(&["gs://bucket", "721211", "reject"]),
            "gs://bucket/721211/reject"
        );
        assert_eq!(storage.join_path(&["/data", "721211"]), "/data/721211");
    }
}
