use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// A path is routed to a backend by its scheme prefix: `gs://` selects the
/// cloud object store, anything else is a local filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Gcs,
}

impl StorageBackend {
    /// URI scheme prefix, including the `://` separator. Empty for local paths.
    pub fn protocol(&self) -> &'static str {
        match self {
            StorageBackend::Local => "",
            StorageBackend::Gcs => "gs://",
        }
    }

    /// Select the backend that owns `path`.
    pub fn for_path(path: &str) -> Self {
        if path.starts_with(StorageBackend::Gcs.protocol()) {
            StorageBackend::Gcs
        } else {
            StorageBackend::Local
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "gcs" | "gcp" => Ok(StorageBackend::Gcs),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Gcs => write!(f, "gcs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_scheme_prefix() {
        assert_eq!(
            StorageBackend::for_path("gs://bucket/a/b.csv"),
            StorageBackend::Gcs
        );
        assert_eq!(
            StorageBackend::for_path("/tmp/a/b.csv"),
            StorageBackend::Local
        );
        assert_eq!(
            StorageBackend::for_path("s3://bucket/a"),
            StorageBackend::Local
        );
    }

    #[test]
    fn parses_backend_names() {
        assert_eq!("GCS".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("nfs".parse::<StorageBackend>().is_err());
    }
}
