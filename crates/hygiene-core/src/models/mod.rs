mod task;

pub use task::RemediationTask;
