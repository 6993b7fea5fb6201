//! Run tokens for last-run-wins discrimination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Monotonic generation counter owned by one controller.
///
/// Each call to [`RunGeneration::mint`] invalidates every token minted
/// before it.
#[derive(Debug, Default)]
pub struct RunGeneration {
    latest: AtomicU64,
}

impl RunGeneration {
    /// Creates a counter with no runs minted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a token for a new run, superseding all earlier ones.
    pub fn mint(&self) -> RunToken {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RunToken::new(generation)
    }

    /// Advances the counter without handing out a token.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns true if `token` belongs to the most recent run.
    #[must_use]
    pub fn is_current(&self, token: &RunToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.generation
    }

    /// Returns the latest generation number.
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// Opaque marker identifying one pipeline run.
///
/// Only the generation takes part in comparisons; the run id exists for log
/// correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunToken {
    generation: u64,
    run_id: Uuid,
    started_at: DateTime<Utc>,
}

impl RunToken {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Returns the generation number.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl PartialEq for RunToken {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation
    }
}

impl Eq for RunToken {}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{} ({})", self.generation, self.run_id)
    }
}
