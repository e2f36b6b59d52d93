//! Process-wide defaults.

/// Tenant used when `TENANTS` is not set.
pub const DEFAULT_TENANT: &str = "721211";

/// Root under which every tenant directory lives.
pub const DEFAULT_STORAGE_ROOT: &str = "gs://lr-select-vm-us-qa-temp";

/// Path segment holding rejected files.
pub const REJECT_PATH_SEGMENT: &str = "reject";

/// Path segment that remediated files are uploaded into.
pub const IN_PATH_SEGMENT: &str = "in";

/// Only files with this suffix are candidates for remediation.
pub const CSV_SUFFIX: &str = ".csv";

/// Appended to a rejected file's path to name its marker object.
pub const SCANNED_SUFFIX: &str = ".scanned";

/// Appended to the scratch copy of a downloaded file.
pub const DOWNLOAD_SUFFIX: &str = ".download";

pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;

pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Buffer used when streaming objects to and from the cloud backend (5 MiB).
pub const TRANSFER_BUFFER_SIZE: usize = 5 * 1024 * 1024;
