//! Core domain model types for fetchflow.
//!
//! This module contains the fundamental types shared by every pipeline:
//! - Pipeline state and terminal failure reasons
//! - Run tokens used to discard superseded runs
//! - Pipeline lifecycle events

mod event;
mod state;
mod token;

pub use event::PipelineEvent;
pub use state::{FailureKind, PipelineFailure, PipelineState, StageIndex};
pub use token::{RunGeneration, RunToken};
