//! Configuration module
//!
//! Settings are read from the process environment (after loading an optional
//! `.env` file). Missing values fall back to the defaults in [`crate::constants`];
//! malformed values fail start-up.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    CSV_SUFFIX, DEFAULT_HTTP_PORT, DEFAULT_SCAN_INTERVAL_SECS, DEFAULT_STORAGE_ROOT,
    DEFAULT_TENANT, IN_PATH_SEGMENT, REJECT_PATH_SEGMENT, SCANNED_SUFFIX,
};

/// When the scanner writes a file's marker object relative to remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPolicy {
    /// Claim the file before the worker runs. A failed remediation is never retried.
    #[default]
    BeforeWork,
    /// Claim the file only once the worker succeeded. A crash between success and
    /// the marker write causes the file to be remediated again.
    AfterSuccess,
}

impl FromStr for MarkerPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "before_work" | "before" => Ok(MarkerPolicy::BeforeWork),
            "after_success" | "after" => Ok(MarkerPolicy::AfterSuccess),
            _ => Err(anyhow::anyhow!("Invalid marker policy: {}", s)),
        }
    }
}

/// Cloud credentials, parsed from the `GCS_CREDENTIALS` JSON document.
#[derive(Clone, Default, Deserialize)]
pub struct GcsCredentials {
    #[serde(rename = "ProjectID", default)]
    pub project_id: Option<String>,
    /// Service account key JSON. When absent, ambient credentials are used.
    #[serde(rename = "SecretAccessKey", default)]
    pub secret_access_key: Option<String>,
}

impl std::fmt::Debug for GcsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsCredentials")
            .field("project_id", &self.project_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl GcsCredentials {
    pub fn parse(raw: &str) -> Result<Self, anyhow::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("GCS_CREDENTIALS must be a JSON object: {}", e))
    }
}

/// Settings for the rejected file scanner.
#[derive(Clone, Debug)]
pub struct ScanSettings {
    pub interval_secs: u64,
    pub tenants: Vec<String>,
    pub storage_root: String,
    pub reject_segment: String,
    pub in_segment: String,
    pub csv_suffix: String,
    pub scanned_suffix: String,
    pub marker_policy: MarkerPolicy,
    pub scratch_dir: PathBuf,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            tenants: vec![DEFAULT_TENANT.to_string()],
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            reject_segment: REJECT_PATH_SEGMENT.to_string(),
            in_segment: IN_PATH_SEGMENT.to_string(),
            csv_suffix: CSV_SUFFIX.to_string(),
            scanned_suffix: SCANNED_SUFFIX.to_string(),
            marker_policy: MarkerPolicy::BeforeWork,
            scratch_dir: env::temp_dir().join("hygiene"),
        }
    }
}

/// Base configuration for the process
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub app_name: String,
    pub server_port: u16,
    pub environment: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub scan: ScanSettings,
    pub gcs_credentials: GcsCredentials,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_name = lookup("APP_NAME").unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "hygiene".to_string())
        });

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let base = BaseConfig {
            app_name,
            server_port: lookup("PORT")
                .unwrap_or_else(|| DEFAULT_HTTP_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
        };

        let defaults = ScanSettings::default();

        let tenants: Vec<String> = lookup("TENANTS")
            .unwrap_or_else(|| DEFAULT_TENANT.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let scan = ScanSettings {
            interval_secs: lookup("SCAN_INTERVAL_SECS")
                .unwrap_or_else(|| DEFAULT_SCAN_INTERVAL_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCAN_INTERVAL_SECS must be a valid number"))?,
            tenants,
            storage_root: lookup("STORAGE_ROOT").unwrap_or(defaults.storage_root),
            reject_segment: lookup("REJECT_PATH_SEGMENT").unwrap_or(defaults.reject_segment),
            in_segment: lookup("IN_PATH_SEGMENT").unwrap_or(defaults.in_segment),
            csv_suffix: lookup("CSV_SUFFIX").unwrap_or(defaults.csv_suffix),
            scanned_suffix: lookup("SCANNED_SUFFIX").unwrap_or(defaults.scanned_suffix),
            marker_policy: match lookup("MARKER_POLICY") {
                Some(raw) => raw.parse()?,
                None => MarkerPolicy::default(),
            },
            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        };

        let gcs_credentials = GcsCredentials::parse(&lookup("GCS_CREDENTIALS").unwrap_or_default())?;

        Ok(Config {
            base,
            scan,
            gcs_credentials,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let scan = &self.scan;
        if scan.interval_secs == 0 {
            return Err(anyhow::anyhow!("SCAN_INTERVAL_SECS must be greater than 0"));
        }
        if scan.tenants.is_empty() {
            return Err(anyhow::anyhow!("TENANTS must name at least one tenant"));
        }
        for (name, segment) in [
            ("REJECT_PATH_SEGMENT", &scan.reject_segment),
            ("IN_PATH_SEGMENT", &scan.in_segment),
        ] {
            if segment.is_empty() || segment.contains('/') {
                return Err(anyhow::anyhow!(
                    "{} must be a single non-empty path segment, got '{}'",
                    name,
                    segment
                ));
            }
        }
        if scan.reject_segment == scan.in_segment {
            return Err(anyhow::anyhow!(
                "REJECT_PATH_SEGMENT and IN_PATH_SEGMENT must differ"
            ));
        }
        if scan.csv_suffix.is_empty() || scan.scanned_suffix.is_empty() {
            return Err(anyhow::anyhow!(
                "CSV_SUFFIX and SCANNED_SUFFIX must not be empty"
            ));
        }
        if scan.storage_root.is_empty() {
            return Err(anyhow::anyhow!("STORAGE_ROOT must not be empty"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    // Convenience getters for common fields
    pub fn app_name(&self) -> &str {
        &self.base.app_name
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan.interval_secs)
    }

    pub fn tenants(&self) -> &[String] {
        &self.scan.tenants
    }

    pub fn storage_root(&self) -> &str {
        &self.scan.storage_root
    }

    pub fn scratch_dir(&self) -> &PathBuf {
        &self.scan.scratch_dir
    }

    pub fn gcs_credentials(&self) -> &GcsCredentials {
        &self.gcs_credentials
    }
}
