//! Observability utilities.

mod timer;

pub use timer::StageTimer;
