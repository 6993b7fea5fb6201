//! Pipeline state machine types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a stage within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageIndex {
    /// The lookup driven by raw input (geocode, rate lookup, shorten).
    First,
    /// The lookup driven by the first stage's output.
    Second,
}

impl StageIndex {
    /// Returns the 1-based stage number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for StageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.number())
    }
}

/// Classification of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream returned zero results.
    NoMatch,
    /// Network, status or parse failure.
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no_match"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

/// Reason carried by [`PipelineState::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFailure {
    /// Stage that failed.
    pub stage: StageIndex,
    /// What kind of failure occurred.
    pub kind: FailureKind,
    /// Short user-displayable message. Never contains credentials.
    pub message: String,
}

impl PipelineFailure {
    /// Creates a new failure.
    #[must_use]
    pub fn new(stage: StageIndex, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The single externally observable state of a pipeline.
///
/// Exactly one variant is current at any time. `Success` and `Error` are
/// terminal for the run that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PipelineState<T> {
    /// No run has started, or the pipeline was reset.
    Idle,
    /// A run is waiting on the given stage.
    Loading(StageIndex),
    /// The most recent run finished with a final result.
    Success(T),
    /// The most recent run failed.
    Error(PipelineFailure),
}

impl<T> Default for PipelineState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> PipelineState<T> {
    /// Returns true for `Success` and `Error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// Returns true while a stage is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// Returns the final result, if the run succeeded.
    #[must_use]
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the failure, if the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Error(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short label used in logs and events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading(_) => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_idle() {
        let state: PipelineState<u32> = PipelineState::default();
        assert_eq!(state, PipelineState::Idle);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Success(1).is_terminal());
        let failure = PipelineFailure::new(StageIndex::First, FailureKind::NoMatch, "none");
        assert!(PipelineState::<u32>::Error(failure).is_terminal());
        assert!(!PipelineState::<u32>::Loading(StageIndex::Second).is_terminal());
    }

    #[test]
    fn test_accessors() {
        let state = PipelineState::Success("done");
        assert_eq!(state.success(), Some(&"done"));
        assert!(state.failure().is_none());
        assert_eq!(state.label(), "success");
    }

    #[test]
    fn test_stage_index_display() {
        assert_eq!(StageIndex::First.to_string(), "stage 1");
        assert_eq!(StageIndex::Second.number(), 2);
    }

    #[test]
    fn test_state_serialize() {
        let state: PipelineState<u32> = PipelineState::Loading(StageIndex::Second);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"loading","value":"second"}"#);

        let idle = serde_json::to_string(&PipelineState::<u32>::Idle).unwrap();
        assert_eq!(idle, r#"{"state":"idle"}"#);
    }
}
