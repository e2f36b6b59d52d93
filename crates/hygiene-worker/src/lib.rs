//! Hygiene Worker
//!
//! Remediates rejected CSV files: download to scratch space, strip every double
//! quote from every field, upload the result to the task's destination.

pub mod context;
pub mod hygiene;
pub mod transform;

pub use context::RemediationHandler;
pub use hygiene::HygieneWorker;
pub use transform::{strip_quotes, strip_quotes_file};
