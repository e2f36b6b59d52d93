#[cfg(feature = "storage-gcs")]
use crate::GcsStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageBackend, StorageError, StorageFacade, StorageResult};
use hygiene_core::Config;
use std::sync::Arc;

/// Create the storage used by the process.
///
/// Returns a [`StorageFacade`] over every compiled-in backend. The backend that
/// owns the configured storage root must be available.
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    #[cfg(feature = "storage-local")]
    let local: Option<Arc<dyn Storage>> = Some(Arc::new(LocalStorage::new()));
    #[cfg(not(feature = "storage-local"))]
    let local: Option<Arc<dyn Storage>> = None;

    #[cfg(feature = "storage-gcs")]
    let cloud: Option<Arc<dyn Storage>> =
        Some(Arc::new(GcsStorage::from_credentials(config.gcs_credentials())));
    #[cfg(not(feature = "storage-gcs"))]
    let cloud: Option<Arc<dyn Storage>> = None;

    let root_backend = StorageBackend::for_path(config.storage_root());
    let available = match root_backend {
        StorageBackend::Local => local.is_some(),
        StorageBackend::Gcs => cloud.is_some(),
    };
    if !available {
        return Err(StorageError::ConfigError(format!(
            "{} storage backend not available for STORAGE_ROOT {}",
            root_backend,
            config.storage_root()
        )));
    }

    tracing::info!(
        storage_root = %config.storage_root(),
        backend = %root_backend,
        "Storage initialized"
    );

    Ok(Arc::new(StorageFacade::new(local, cloud)))
}

#[cfg(all(test, feature = "storage-local", feature = "storage-gcs"))]
mod tests {
    use super::*;

    #[test]
    fn test_create_storage_for_cloud_root() {
        let config = Config::from_lookup(|key| match key {
            "STORAGE_ROOT" => Some("gs://bucket".to_string()),
            _ => None,
        })
        .unwrap();

        let storage = create_storage(&config).unwrap();
        assert_eq!(
            storage.join_path(&[config.storage_root(), "721211"]),
            "gs://bucket/721211"
        );
    }
}
