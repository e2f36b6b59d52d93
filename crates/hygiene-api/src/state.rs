//! Application state shared by start-up, the server and shutdown.

use hygiene_services::RejectedFileScanner;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub scanner: Arc<RejectedFileScanner>,
    /// Cancelled on SIGINT/SIGTERM; stops the scanner and the HTTP server.
    pub shutdown: CancellationToken,
}
