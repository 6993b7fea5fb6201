//! Lifecycle events emitted by a pipeline controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{PipelineFailure, RunToken, StageIndex};

/// An event emitted while a pipeline run progresses.
///
/// Events are consumed by an [`EventSink`](crate::events::EventSink) for
/// logging or analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (e.g., "pipeline.run_started").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    fn for_run(event_type: &str, pipeline: &str, token: &RunToken) -> Self {
        Self::new(event_type)
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("generation", serde_json::json!(token.generation()))
            .add_data("run_id", serde_json::json!(token.run_id().to_string()))
    }

    /// Creates a "pipeline.run_started" event.
    #[must_use]
    pub fn run_started(pipeline: &str, token: &RunToken) -> Self {
        Self::for_run("pipeline.run_started", pipeline, token)
    }

    /// Creates a "pipeline.run_rejected" event for input that failed validation.
    #[must_use]
    pub fn run_rejected(pipeline: &str, field: &str) -> Self {
        Self::new("pipeline.run_rejected")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("field", serde_json::json!(field))
    }

    /// Creates a "pipeline.stage_started" event.
    #[must_use]
    pub fn stage_started(pipeline: &str, token: &RunToken, stage: StageIndex, resolver: &str) -> Self {
        Self::for_run("pipeline.stage_started", pipeline, token)
            .add_data("stage", serde_json::json!(stage.number()))
            .add_data("resolver", serde_json::json!(resolver))
    }

    /// Creates a "pipeline.stage_completed" event.
    #[must_use]
    pub fn stage_completed(
        pipeline: &str,
        token: &RunToken,
        stage: StageIndex,
        duration_ms: f64,
    ) -> Self {
        Self::for_run("pipeline.stage_completed", pipeline, token)
            .add_data("stage", serde_json::json!(stage.number()))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "pipeline.run_succeeded" event.
    #[must_use]
    pub fn run_succeeded(pipeline: &str, token: &RunToken) -> Self {
        Self::for_run("pipeline.run_succeeded", pipeline, token)
    }

    /// Creates a "pipeline.run_failed" event.
    #[must_use]
    pub fn run_failed(pipeline: &str, token: &RunToken, failure: &PipelineFailure) -> Self {
        Self::for_run("pipeline.run_failed", pipeline, token)
            .add_data("stage", serde_json::json!(failure.stage.number()))
            .add_data("kind", serde_json::json!(failure.kind.to_string()))
            .add_data("message", serde_json::json!(failure.message))
    }

    /// Creates a "pipeline.run_superseded" event.
    #[must_use]
    pub fn run_superseded(pipeline: &str, token: &RunToken, stage: StageIndex) -> Self {
        Self::for_run("pipeline.run_superseded", pipeline, token)
            .add_data("stage", serde_json::json!(stage.number()))
    }
}
