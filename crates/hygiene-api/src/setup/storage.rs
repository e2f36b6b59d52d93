//! Storage setup and initialization

use anyhow::Result;
use hygiene_core::Config;
use hygiene_services::{create_storage, Storage};
use std::sync::Arc;

/// Build the storage facade every component shares.
pub fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage abstraction...");
    let storage = create_storage(config)?;
    tracing::info!(
        storage_root = %config.storage_root(),
        "Storage abstraction initialized successfully"
    );
    Ok(storage)
}
