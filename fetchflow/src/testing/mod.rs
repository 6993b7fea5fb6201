//! Testing utilities for fetchflow pipelines.
//!
//! This module provides:
//! - A scripted stage resolver whose responses are released on demand
//! - A scripted HTTP transport that records requests

mod mocks;

pub use mocks::{RecordedRequest, ScriptedResolver, ScriptedTransport};
