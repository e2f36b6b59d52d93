//! Periodic scan for rejected CSV files.
//!
//! Every interval the scanner lists each tenant's reject directory, claims the
//! CSV files nobody has claimed yet by writing a marker object next to them, and
//! hands each one to a [`hygiene_worker::RemediationHandler`]. Ticks run one at a
//! time and dispatch sequentially.

mod service;

pub use service::RejectedFileScanner;

use std::collections::HashSet;
use std::time::Duration;

use hygiene_core::{MarkerPolicy, ScanSettings};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("rejected file scanner is already running")]
    AlreadyRunning,
}

/// Lifecycle of a scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScannerPhase {
    /// Constructed, or restarting after a crashed tick.
    Idle = 0,
    /// The timer loop is running.
    Ticking = 1,
    /// Cancelled; the loop has exited.
    Stopped = 2,
}

impl ScannerPhase {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ScannerPhase::Ticking,
            2 => ScannerPhase::Stopped,
            _ => ScannerPhase::Idle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub interval: Duration,
    /// Scanned in this order.
    pub tenants: Vec<String>,
    pub storage_root: String,
    pub reject_segment: String,
    pub in_segment: String,
    pub csv_suffix: String,
    pub scanned_suffix: String,
    pub marker_policy: MarkerPolicy,
}

impl From<&ScanSettings> for ScannerConfig {
    fn from(settings: &ScanSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs),
            tenants: settings.tenants.clone(),
            storage_root: settings.storage_root.clone(),
            reject_segment: settings.reject_segment.clone(),
            in_segment: settings.in_segment.clone(),
            csv_suffix: settings.csv_suffix.clone(),
            scanned_suffix: settings.scanned_suffix.clone(),
            marker_policy: settings.marker_policy,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from(&ScanSettings::default())
    }
}

/// State owned by the scanner's background task.
#[derive(Debug, Default)]
pub struct ScannerState {
    /// Names of tasks dispatched during this process lifetime.
    pub seen: HashSet<String>,
    /// Set when the loop saw cancellation; the supervisor stops restarting it.
    pub stopped: bool,
}

/// Counters for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Tenants whose reject directory could be listed.
    pub tenants: usize,
    pub candidates: usize,
    pub dispatched: usize,
    pub failed: usize,
}
