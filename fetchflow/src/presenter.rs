//! Plain-text rendering of pipeline state.

use std::fmt::Display;

use crate::core::PipelineState;

/// Text shown while a run is in flight.
pub const LOADING_TEXT: &str = "Loading...";

/// Renders a state the way the demo binary prints it.
///
/// `Idle` renders as an empty string.
#[must_use]
pub fn render_state<T: Display>(state: &PipelineState<T>) -> String {
    match state {
        PipelineState::Idle => String::new(),
        PipelineState::Loading(stage) => format!("{LOADING_TEXT} ({stage})"),
        PipelineState::Success(value) => value.to_string(),
        PipelineState::Error(failure) => format!("Error: {failure}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, PipelineFailure, StageIndex};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_each_state() {
        assert_eq!(render_state(&PipelineState::<u32>::Idle), "");
        assert_eq!(
            render_state(&PipelineState::<u32>::Loading(StageIndex::Second)),
            "Loading... (stage 2)"
        );
        assert_eq!(render_state(&PipelineState::Success(46.0)), "46");

        let failure = PipelineFailure::new(
            StageIndex::First,
            FailureKind::NoMatch,
            "No results found for \"Atlantis\".",
        );
        assert_eq!(
            render_state(&PipelineState::<u32>::Error(failure)),
            "Error: No results found for \"Atlantis\"."
        );
    }
}
