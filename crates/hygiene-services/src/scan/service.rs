use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use hygiene_core::{MarkerPolicy, RemediationTask};
use hygiene_storage::{Storage, StorageResult};
use hygiene_worker::RemediationHandler;

use super::{ScanError, ScanSummary, ScannerConfig, ScannerPhase, ScannerState};

/// Periodically claims rejected CSV files and hands them to a remediation handler.
///
/// One instance is built at start-up and started once; a second [`start`] while
/// the loop is alive fails with [`ScanError::AlreadyRunning`].
///
/// [`start`]: RejectedFileScanner::start
pub struct RejectedFileScanner {
    storage: Arc<dyn Storage>,
    handler: Arc<dyn RemediationHandler>,
    config: ScannerConfig,
    running: AtomicBool,
    phase: AtomicU8,
}

impl RejectedFileScanner {
    pub fn new(
        storage: Arc<dyn Storage>,
        handler: Arc<dyn RemediationHandler>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            storage,
            handler,
            config,
            running: AtomicBool::new(false),
            phase: AtomicU8::new(ScannerPhase::Idle as u8),
        }
    }

    pub fn phase(&self) -> ScannerPhase {
        ScannerPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_phase(&self, phase: ScannerPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Start the background scan loop.
    /// Returns a JoinHandle that completes once `cancel` fires.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> Result<JoinHandle<()>, ScanError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanError::AlreadyRunning);
        }

        tracing::info!(
            interval_secs = self.config.interval.as_secs_f64(),
            tenants = ?self.config.tenants,
            marker_policy = ?self.config.marker_policy,
            "Rejected file scanner started"
        );

        Ok(tokio::spawn(async move { self.supervise(cancel).await }))
    }

    /// Runs the loop, restarting it from Idle whenever a tick panics.
    async fn supervise(self: Arc<Self>, cancel: CancellationToken) {
        let mut state = ScannerState::default();

        while !state.stopped {
            self.set_phase(ScannerPhase::Idle);
            let outcome = AssertUnwindSafe(self.run(&mut state, &cancel))
                .catch_unwind()
                .await;

            if let Err(panic) = outcome {
                tracing::error!(
                    panic = %panic_message(panic.as_ref()),
                    "Rejected file scanner crashed, restarting"
                );
                state.stopped = cancel.is_cancelled();
            }
        }

        self.set_phase(ScannerPhase::Stopped);
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(
            dispatched = state.seen.len(),
            "Rejected file scanner stopped"
        );
    }

    /// Timer loop. Marks the state stopped and returns once `cancel` fires; a tick
    /// in progress runs to completion.
    async fn run(&self, state: &mut ScannerState, cancel: &CancellationToken) {
        self.set_phase(ScannerPhase::Ticking);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    state.stopped = true;
                    return;
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            let start = std::time::Instant::now();
            let summary = self.scan(state).await;
            tracing::debug!(
                tenants = summary.tenants,
                candidates = summary.candidates,
                dispatched = summary.dispatched,
                failed = summary.failed,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Scan tick completed"
            );
        }
    }

    /// One scan pass over every configured tenant, in configuration order.
    pub async fn scan(&self, state: &mut ScannerState) -> ScanSummary {
        let mut summary = ScanSummary::default();

        for tenant in &self.config.tenants {
            let reject_dir = self.storage.join_path(&[
                self.config.storage_root.as_str(),
                tenant.as_str(),
                self.config.reject_segment.as_str(),
            ]);

            let files = match self.list_rejected(&reject_dir).await {
                Ok(files) => files,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        tenant = %tenant,
                        dir = %reject_dir,
                        "Failed to list rejected files"
                    );
                    continue;
                }
            };
            summary.tenants += 1;

            let listed: HashSet<&str> = files.iter().map(String::as_str).collect();
            for file in &files {
                if !file.ends_with(&self.config.csv_suffix) || state.seen.contains(file) {
                    continue;
                }
                let marker = format!("{}{}", file, self.config.scanned_suffix);
                if listed.contains(marker.as_str()) {
                    continue;
                }

                summary.candidates += 1;
                let task = RemediationTask::for_rejected_file(
                    file,
                    &self.config.reject_segment,
                    &self.config.in_segment,
                );
                if self.dispatch(state, task).await {
                    summary.dispatched += 1;
                } else {
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Files directly in `reject_dir` and in each of its subdirectories.
    async fn list_rejected(&self, reject_dir: &str) -> StorageResult<Vec<String>> {
        let (objects, _) = self.storage.list_children(reject_dir).await?;
        let mut files: Vec<String> = objects.into_iter().map(|o| o.name).collect();

        for folder in self.storage.list_subdirectories(reject_dir).await? {
            match self.storage.list_children(&folder).await {
                Ok((objects, _)) => files.extend(objects.into_iter().map(|o| o.name)),
                Err(e) => {
                    tracing::warn!(error = %e, dir = %folder, "Failed to list reject subdirectory");
                }
            }
        }

        Ok(files)
    }

    /// Claim and remediate one file. Returns whether remediation succeeded.
    async fn dispatch(&self, state: &mut ScannerState, task: RemediationTask) -> bool {
        tracing::info!(
            task = %task.name,
            destination = %task.destination_location,
            "Dispatching rejected file"
        );
        state.seen.insert(task.name.clone());

        let marker = task.marker_location(&self.config.scanned_suffix);
        if self.config.marker_policy == MarkerPolicy::BeforeWork {
            self.write_marker(&marker).await;
        }

        let cancel = CancellationToken::new();
        let result = self.handler.remediate(&task, cancel.clone()).await;
        cancel.cancel();

        match result {
            Ok(()) => {
                if self.config.marker_policy == MarkerPolicy::AfterSuccess {
                    self.write_marker(&marker).await;
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, task = %task.name, "Remediation failed");
                false
            }
        }
    }

    async fn write_marker(&self, marker: &str) {
        if let Err(e) = self.storage.put(marker, Vec::new()).await {
            tracing::error!(error = %e, marker = %marker, "Failed to write scanned marker");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
