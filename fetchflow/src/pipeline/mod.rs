//! Dependent fetch pipelines.
//!
//! This module provides:
//! - The two-stage [`PipelineController`]
//! - Run outcomes reported to the caller

mod controller;

#[cfg(test)]
mod integration_tests;

pub use controller::{PipelineController, RunOutcome, TIMEOUT_MESSAGE};
