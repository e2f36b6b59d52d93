use crate::locator::{append_path_suffix, ObjectLocator};
use crate::traits::{Storage, StorageError, StorageObject, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use hygiene_core::constants::TRANSFER_BUFFER_SIZE;
use hygiene_core::GcsCredentials;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectMeta, ObjectStore, ObjectStoreExt, PutPayload, WriteMultipart};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

/// Opens an object store client for one bucket.
///
/// [`GcsStorage`] asks for a fresh client on every operation, so a storage value
/// holds no connection state and can be shared freely.
pub trait BucketConnector: Send + Sync {
    fn connect(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Connects to Google Cloud Storage.
///
/// Uses the service account key from the configured credentials when present,
/// and falls back to the `GOOGLE_*` environment otherwise.
#[derive(Clone, Default)]
pub struct GcsConnector {
    service_account_key: Option<String>,
}

impl GcsConnector {
    pub fn new(credentials: &GcsCredentials) -> Self {
        Self {
            service_account_key: credentials
                .secret_access_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        }
    }
}

impl BucketConnector for GcsConnector {
    fn connect(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);

        if let Some(ref key) = self.service_account_key {
            tracing::debug!(bucket = %bucket, "Connecting to GCS with service account key");
            builder = builder.with_service_account_key(key);
        }

        let store: Arc<dyn ObjectStore> = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );

        Ok(store)
    }
}

/// Keeps one in-memory store per bucket. Used by tests and local runs.
#[derive(Default)]
pub struct MemoryConnector {
    stores: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BucketConnector for MemoryConnector {
    fn connect(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))?;
        let store: Arc<dyn ObjectStore> = stores
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone();
        Ok(store)
    }
}

/// One row of a listing: either a common prefix or an object.
struct ListEntry {
    prefix: Option<ObjectPath>,
    object: Option<ObjectMeta>,
}

/// Google Cloud Storage implementation
///
/// Paths are `gs://{bucket}/{key}`. Directories are key prefixes.
#[derive(Clone)]
pub struct GcsStorage {
    connector: Arc<dyn BucketConnector>,
}

impl GcsStorage {
    pub fn new(connector: Arc<dyn BucketConnector>) -> Self {
        Self { connector }
    }

    /// Storage backed by Google Cloud Storage.
    pub fn from_credentials(credentials: &GcsCredentials) -> Self {
        Self::new(Arc::new(GcsConnector::new(credentials)))
    }

    fn open(&self, path: &str) -> StorageResult<(ObjectLocator, Arc<dyn ObjectStore>)> {
        let locator = ObjectLocator::parse(path)?;
        let store = self.connector.connect(&locator.bucket)?;
        Ok((locator, store))
    }

    /// Object path for a raw key. Keys are stored as written; only keys that
    /// are not valid object paths (empty segments, `.` or `..`) get normalized.
    fn key_path(key: &str) -> ObjectPath {
        ObjectPath::parse(key).unwrap_or_else(|_| ObjectPath::from(key))
    }

    fn object_name(bucket: &str, key: &str) -> String {
        format!("{}{}/{}", StorageBackend::Gcs.protocol(), bucket, key)
    }

    fn to_object(bucket: &str, meta: &ObjectMeta) -> StorageObject {
        StorageObject {
            name: Self::object_name(bucket, meta.location.as_ref()),
            size: meta.size,
            modified: Some(meta.last_modified),
            checksum: meta.e_tag.clone(),
            created: None,
        }
    }

    async fn list_keys(store: &dyn ObjectStore, key: &str) -> StorageResult<Vec<ObjectMeta>> {
        let prefix = Self::key_path(key);
        let mut stream = store.list(Some(&prefix));
        let mut objects = Vec::new();
        while let Some(meta) = stream.next().await {
            objects.push(meta.map_err(|e| StorageError::BackendError(e.to_string()))?);
        }
        Ok(objects)
    }

    /// Single-level listing, as common prefixes followed by objects.
    async fn list_level(store: &dyn ObjectStore, key: &str) -> StorageResult<Vec<ListEntry>> {
        let prefix = Self::key_path(key);
        let result = store
            .list_with_delimiter(Some(&prefix))
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let mut entries: Vec<ListEntry> = result
            .common_prefixes
            .into_iter()
            .map(|p| ListEntry {
                prefix: Some(p),
                object: None,
            })
            .collect();
        entries.extend(result.objects.into_iter().map(|meta| ListEntry {
            prefix: None,
            object: Some(meta),
        }));
        Ok(entries)
    }

    async fn head_exists(store: &dyn ObjectStore, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        store.head(&Self::key_path(key)).await.is_ok()
    }

    async fn copy_key(
        from_store: &Arc<dyn ObjectStore>,
        from_bucket: &str,
        from_key: &ObjectPath,
        to_store: &Arc<dyn ObjectStore>,
        to_bucket: &str,
        to_key: &ObjectPath,
    ) -> StorageResult<()> {
        if from_bucket == to_bucket {
            return from_store
                .copy(from_key, to_key)
                .await
                .map_err(|e| StorageError::BackendError(e.to_string()));
        }

        let result = from_store
            .get(from_key)
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        if result.meta.size <= TRANSFER_BUFFER_SIZE as u64 {
            let data = result
                .bytes()
                .await
                .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
            return to_store
                .put(to_key, PutPayload::from(data))
                .await
                .map(|_| ())
                .map_err(|e| StorageError::UploadFailed(e.to_string()));
        }

        let upload = to_store
            .put_multipart(to_key)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, TRANSFER_BUFFER_SIZE);
        let mut stream = result.into_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    writer.abort().await.ok();
                    return Err(StorageError::DownloadFailed(e.to_string()));
                }
            };
            if let Err(e) = writer.wait_for_capacity(2).await {
                writer.abort().await.ok();
                return Err(StorageError::UploadFailed(e.to_string()));
            }
            writer.put(chunk);
        }
        writer
            .finish()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::UploadFailed(e.to_string()))
    }
}

#[async_trait]
impl Storage for GcsStorage {
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let (locator, store) = self.open(path)?;
        let start = std::time::Instant::now();
        let location = Self::key_path(&locator.key);

        let result = store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %locator.bucket,
                    key = %locator.key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS get failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %locator.bucket,
            key = %locator.key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS get successful"
        );

        Ok(bytes.to_vec())
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let (locator, store) = self.open(path)?;
        let start = std::time::Instant::now();
        let size = data.len();
        let location = Self::key_path(&locator.key);

        store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %locator.bucket,
                    key = %locator.key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS put failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %locator.bucket,
            key = %locator.key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS put successful"
        );

        Ok(())
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        let (locator, store) = self.open(path)?;
        let location = Self::key_path(&locator.key);

        match store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    bucket = %locator.bucket,
                    key = %locator.key,
                    "GCS delete successful"
                );
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn remove_dir(&self, path: &str) -> StorageResult<()> {
        let (locator, store) = self.open(path)?;
        let prefix = Self::key_path(&locator.key);

        let mut stream = store.list(Some(&prefix));
        match stream.next().await {
            None => Ok(()),
            Some(Ok(_)) => Err(StorageError::BackendError(format!(
                "directory not empty: {}",
                path
            ))),
            Some(Err(e)) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn remove_all(&self, path: &str) -> StorageResult<()> {
        let (locator, store) = self.open(path)?;
        let start = std::time::Instant::now();

        let mut doomed: Vec<ObjectPath> = Self::list_keys(store.as_ref(), &locator.key)
            .await?
            .into_iter()
            .map(|meta| meta.location)
            .collect();
        if Self::head_exists(store.as_ref(), &locator.key).await {
            doomed.push(Self::key_path(&locator.key));
        }

        for location in &doomed {
            match store.delete(location).await {
                Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %locator.bucket,
                        key = %location,
                        "GCS recursive delete failed"
                    );
                    return Err(StorageError::DeleteFailed(e.to_string()));
                }
            }
        }

        tracing::info!(
            bucket = %locator.bucket,
            prefix = %locator.key,
            objects = doomed.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS recursive delete successful"
        );

        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let (src, src_store) = self.open(from)?;
        let (dst, dst_store) = self.open(to)?;
        let start = std::time::Instant::now();

        if Self::head_exists(src_store.as_ref(), &src.key).await {
            Self::copy_key(
                &src_store,
                &src.bucket,
                &Self::key_path(&src.key),
                &dst_store,
                &dst.bucket,
                &Self::key_path(&dst.key),
            )
            .await?;
            tracing::info!(
                from = %from,
                to = %to,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS copy successful"
            );
            return Ok(());
        }

        let objects = Self::list_keys(src_store.as_ref(), &src.key).await?;
        if objects.is_empty() {
            return Err(StorageError::NotFound(from.to_string()));
        }

        let src_dir = src.key_as_dir();
        let dst_dir = dst.key_as_dir();
        for meta in &objects {
            let relative = meta
                .location
                .as_ref()
                .strip_prefix(src_dir.as_str())
                .unwrap_or(meta.location.as_ref());
            let target = Self::key_path(&format!("{}{}", dst_dir, relative));
            Self::copy_key(
                &src_store,
                &src.bucket,
                &meta.location,
                &dst_store,
                &dst.bucket,
                &target,
            )
            .await?;
        }

        tracing::info!(
            from = %from,
            to = %to,
            objects = objects.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS directory copy successful"
        );

        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> StorageResult<()> {
        self.copy(from, to).await?;
        self.remove_all(from).await
    }

    async fn exists(&self, path: &str) -> bool {
        match self.open(path) {
            Ok((locator, store)) => Self::head_exists(store.as_ref(), &locator.key).await,
            Err(_) => false,
        }
    }

    async fn list(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)> {
        let (locator, store) = self.open(dir)?;
        let mut size = 0u64;
        let objects: Vec<StorageObject> = Self::list_keys(store.as_ref(), &locator.key)
            .await?
            .iter()
            .map(|meta| {
                size += meta.size;
                Self::to_object(&locator.bucket, meta)
            })
            .collect();

        tracing::debug!(
            bucket = %locator.bucket,
            prefix = %locator.key,
            objects = objects.len(),
            size_bytes = size,
            "GCS list"
        );

        Ok((objects, size))
    }

    async fn list_children(&self, dir: &str) -> StorageResult<(Vec<StorageObject>, u64)> {
        let (locator, store) = self.open(dir)?;
        let mut objects = Vec::new();
        let mut size = 0u64;

        for entry in Self::list_level(store.as_ref(), &locator.key).await? {
            match entry {
                ListEntry {
                    object: Some(meta), ..
                } => {
                    size += meta.size;
                    objects.push(Self::to_object(&locator.bucket, &meta));
                }
                ListEntry {
                    prefix: Some(_), ..
                } => {}
                _ => continue,
            }
        }

        Ok((objects, size))
    }

    async fn list_subdirectories(&self, dir: &str) -> StorageResult<Vec<String>> {
        let (locator, store) = self.open(dir)?;

        let dirs = Self::list_level(store.as_ref(), &locator.key)
            .await?
            .into_iter()
            .filter_map(|entry| entry.prefix)
            .map(|prefix| {
                append_path_suffix(&Self::object_name(&locator.bucket, prefix.as_ref()))
            })
            .collect();

        Ok(dirs)
    }

    async fn download(&self, remote: &str, local: &Path) -> StorageResult<()> {
        let (locator, store) = self.open(remote)?;
        let start = std::time::Instant::now();
        let location = Self::key_path(&locator.key);

        let result = store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(remote.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(local).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to create {}: {}",
                local.display(),
                e
            ))
        })?;
        let mut writer = BufWriter::with_capacity(TRANSFER_BUFFER_SIZE, file);

        let mut size = 0usize;
        let mut stream = result.into_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
            size += chunk.len();
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        tracing::info!(
            bucket = %locator.bucket,
            key = %locator.key,
            local = %local.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS download successful"
        );

        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> StorageResult<()> {
        let (locator, store) = self.open(remote)?;
        let start = std::time::Instant::now();
        let location = Self::key_path(&locator.key);

        let mut file = tokio::fs::File::open(local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(local.display().to_string())
            } else {
                StorageError::UploadFailed(format!("Failed to open {}: {}", local.display(), e))
            }
        })?;
        let size = file.metadata().await?.len();

        // Small files go up in one request.
        if size <= TRANSFER_BUFFER_SIZE as u64 {
            let mut data = Vec::with_capacity(size as usize);
            file.read_to_end(&mut data).await?;
            store
                .put(&location, PutPayload::from(Bytes::from(data)))
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        } else {
            let upload = store
                .put_multipart(&location)
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            let mut writer = WriteMultipart::new_with_chunk_size(upload, TRANSFER_BUFFER_SIZE);
            let mut buffer = vec![0u8; TRANSFER_BUFFER_SIZE];
            loop {
                let read = match file.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        writer.abort().await.ok();
                        return Err(StorageError::UploadFailed(e.to_string()));
                    }
                };
                if let Err(e) = writer.wait_for_capacity(2).await {
                    writer.abort().await.ok();
                    return Err(StorageError::UploadFailed(e.to_string()));
                }
                writer.write(&buffer[..read]);
            }
            writer
                .finish()
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        }

        tracing::info!(
            bucket = %locator.bucket,
            key = %locator.key,
            local = %local.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(())
    }

    fn join_path(&self, segments: &[&str]) -> String {
        let protocol = StorageBackend::Gcs.protocol();
        let parts: Vec<&str> = segments
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if i == 0 {
                    s.strip_prefix(protocol).unwrap_or(s)
                } else {
                    s
                }
            })
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
            .collect();
        format!("{}{}", protocol, parts.join("/"))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
