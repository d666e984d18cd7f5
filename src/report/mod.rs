//! Report persistence modules.
//!
//! This module writes the per-domain artifacts, the aggregated report,
//! and the run summary into the workspace for downstream renderers.

pub mod persist;

pub use persist::{write_artifacts, PersistOutcome};
