//! Per-stage timing.

use std::time::Instant;

use crate::core::StageIndex;

/// Measures how long one stage resolver took.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
    stage: StageIndex,
}

impl StageTimer {
    /// Starts timing `stage`.
    #[must_use]
    pub fn start(stage: StageIndex) -> Self {
        Self {
            start: Instant::now(),
            stage,
        }
    }

    /// Returns the stage being timed.
    #[must_use]
    pub fn stage(&self) -> StageIndex {
        self.stage
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
