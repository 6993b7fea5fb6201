//! Weather resolution pipeline.
//!
//! Free-text city or postal code → geocode lookup → current weather at the
//! first match's coordinates.

mod current;
mod geocode;
mod models;

pub use current::CurrentWeatherResolver;
pub use geocode::GeocodeResolver;
pub use models::{Coordinates, GeoMatch, LocationQuery, WeatherSnapshot};

use std::sync::Arc;

use crate::config::WeatherConfig;
use crate::errors::ConfigError;
use crate::pipeline::PipelineController;
use crate::transport::HttpTransport;

/// Controller type for the weather pipeline.
pub type WeatherPipeline = PipelineController<GeocodeResolver, CurrentWeatherResolver>;

/// Builds a weather pipeline over `transport`.
pub fn weather_pipeline(
    config: &WeatherConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<WeatherPipeline, ConfigError> {
    let geocode = GeocodeResolver::new(config, transport.clone())?;
    let current = CurrentWeatherResolver::new(config, transport)?;
    Ok(PipelineController::new("weather", geocode, current))
}
