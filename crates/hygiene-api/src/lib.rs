//! Hygiene API Library
//!
//! This crate wires configuration, storage, the remediation worker and the
//! rejected file scanner together, and serves the heartbeat endpoint.

pub mod constants;
mod handlers;
pub mod setup;
pub mod state;
mod telemetry;
