//! API constants

/// Versioned path prefix for every route.
pub const API_PREFIX: &str = "/v1";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "hygiene=debug,tower_http=debug";
