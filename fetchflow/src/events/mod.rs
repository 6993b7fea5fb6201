//! Event sinks for pipeline observability.
//!
//! Controllers report run lifecycle transitions to an [`EventSink`]. The
//! sink is passed to each controller explicitly; there is no global sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
