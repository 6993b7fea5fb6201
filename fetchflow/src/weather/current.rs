//! Weather stage: coordinates to current conditions.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::models::{GeoMatch, WeatherSnapshot};
use crate::config::{Credential, WeatherConfig};
use crate::errors::{ConfigError, ResolveError};
use crate::stages::StageResolver;
use crate::transport::HttpTransport;

const WEATHER_PATH: &str = "/data/2.5/weather";

/// Fetches current conditions for a geocoded location.
pub struct CurrentWeatherResolver {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: Credential,
    units: Option<String>,
}

impl CurrentWeatherResolver {
    /// Creates a resolver; fails if no API key is configured.
    pub fn new(config: &WeatherConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, ConfigError> {
        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.require_api_key()?.clone(),
            units: config.units.clone(),
        })
    }
}

impl std::fmt::Debug for CurrentWeatherResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentWeatherResolver")
            .field("base_url", &self.base_url)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageResolver for CurrentWeatherResolver {
    type Input = GeoMatch;
    type Output = WeatherSnapshot;

    fn name(&self) -> &str {
        "current_weather"
    }

    async fn resolve(&self, location: &GeoMatch) -> Result<WeatherSnapshot, ResolveError> {
        let coords = location.coordinates();
        let url = format!("{}{WEATHER_PATH}", self.base_url);
        let mut params = vec![
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("appid", self.api_key.expose().to_string()),
        ];
        if let Some(units) = &self.units {
            params.push(("units", units.clone()));
        }

        let body = self.transport.get_json(&url, &params).await?.into_success()?;
        let snapshot = WeatherSnapshot::from_payload(&body);
        debug!(
            lat = coords.lat,
            lon = coords.lon,
            location = ?snapshot.location,
            "Weather lookup finished"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::testing::ScriptedTransport;
    use pretty_assertions::assert_eq;

    fn paris() -> GeoMatch {
        GeoMatch {
            name: Some("Paris".into()),
            lat: 48.85,
            lon: 2.35,
            country: Some("FR".into()),
            state: None,
        }
    }

    fn config(units: Option<&str>) -> WeatherConfig {
        WeatherConfig {
            base_url: "https://wx.test".into(),
            api_key: Some(Credential::new("key-123")),
            units: units.map(str::to_string),
            ..WeatherConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetches_by_coordinates() {
        let transport = Arc::new(ScriptedTransport::new().route_json(
            WEATHER_PATH,
            serde_json::json!({
                "name": "Paris",
                "main": {"temp": 17.3, "humidity": 52},
                "weather": [{"description": "light rain", "icon": "10d"}]
            }),
        ));
        let resolver = CurrentWeatherResolver::new(&config(Some("metric")), transport.clone()).unwrap();

        let snapshot = resolver.resolve(&paris()).await.unwrap();

        assert_eq!(snapshot.temperature, Some(17.3));
        assert_eq!(snapshot.humidity, Some(52));
        assert!(snapshot.wind_speed.is_none());

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.url, "https://wx.test/data/2.5/weather");
        assert_eq!(request.query_value("lat"), Some("48.85"));
        assert_eq!(request.query_value("lon"), Some("2.35"));
        assert_eq!(request.query_value("units"), Some("metric"));
    }

    #[tokio::test]
    async fn test_units_omitted_by_default() {
        let transport = Arc::new(ScriptedTransport::new().route_json(WEATHER_PATH, serde_json::json!({})));
        let resolver = CurrentWeatherResolver::new(&config(None), transport.clone()).unwrap();

        let snapshot = resolver.resolve(&paris()).await.unwrap();

        assert_eq!(snapshot, WeatherSnapshot::default());
        assert_eq!(transport.requests()[0].query_value("units"), None);
    }

    #[tokio::test]
    async fn test_network_error_is_transport_failure() {
        let transport = Arc::new(
            ScriptedTransport::new().route(WEATHER_PATH, Err(TransportError::Request("reset".into()))),
        );
        let resolver = CurrentWeatherResolver::new(&config(None), transport).unwrap();

        let err = resolver.resolve(&paris()).await.unwrap_err();

        assert_eq!(
            err,
            ResolveError::Transport(TransportError::Request("reset".into()))
        );
    }
}
