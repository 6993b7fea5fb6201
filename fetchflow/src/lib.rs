//! # fetchflow
//!
//! Dependent multi-stage fetch pipelines.
//!
//! A pipeline runs two asynchronous lookups where the second consumes the
//! first's output, and exposes a single observable state:
//!
//! - **Stage resolvers**: one HTTP lookup each, success value or failure
//! - **Pipeline controller**: sequences the stages and owns the state
//! - **Last run wins**: a newer run makes every older run's results stale
//! - **Event-driven observability**: lifecycle events through an [`EventSink`](events::EventSink)
//!
//! Three pipelines are provided: weather (geocode, then current weather),
//! currency (rate table, then quote rate) and a single-stage URL shortener.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fetchflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let transport = Arc::new(ReqwestTransport::from_config(&config.http)?);
//! let pipeline = weather_pipeline(&config.weather, transport)?;
//!
//! pipeline.run(LocationQuery::city("Paris")).await;
//! println!("{}", render_state(&pipeline.current_state()));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod presenter;
pub mod shortener;
pub mod stages;
pub mod testing;
pub mod transport;
pub mod weather;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, Credential};
    pub use crate::core::{
        FailureKind, PipelineEvent, PipelineFailure, PipelineState, RunToken, StageIndex,
    };
    pub use crate::currency::{
        currency_pipeline, derive_amount, CurrencyConverter, CurrencyPair, QuoteRate,
    };
    pub use crate::errors::{
        ConfigError, FetchflowError, ResolveError, TransportError, ValidationError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{PipelineController, RunOutcome};
    pub use crate::presenter::render_state;
    pub use crate::shortener::{shortener_pipeline, LongUrl, ShortLink};
    pub use crate::stages::{Passthrough, StageResolver, Validate};
    pub use crate::transport::{HttpTransport, ReqwestTransport};
    pub use crate::weather::{weather_pipeline, LocationQuery, WeatherSnapshot};
}
