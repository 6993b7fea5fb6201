//! Geocode stage: location descriptor to coordinates.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::models::{GeoMatch, LocationQuery};
use crate::config::{Credential, WeatherConfig};
use crate::errors::{ConfigError, ResolveError, TransportError};
use crate::stages::StageResolver;
use crate::transport::HttpTransport;

const DIRECT_PATH: &str = "/geo/1.0/direct";
const ZIP_PATH: &str = "/geo/1.0/zip";

/// The direct endpoint answers with a list; the zip endpoint with a single
/// record.
#[derive(Deserialize)]
#[serde(untagged)]
enum GeoPayload {
    Many(Vec<GeoMatch>),
    One(GeoMatch),
}

/// Resolves a [`LocationQuery`] to the first matching [`GeoMatch`].
pub struct GeocodeResolver {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: Credential,
    limit: u32,
}

impl GeocodeResolver {
    /// Creates a resolver; fails if no API key is configured.
    pub fn new(config: &WeatherConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, ConfigError> {
        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.require_api_key()?.clone(),
            limit: config.geocode_limit,
        })
    }

    fn parse_matches(body: serde_json::Value) -> Result<Vec<GeoMatch>, TransportError> {
        if body.is_null() {
            return Ok(Vec::new());
        }
        let payload: GeoPayload =
            serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(match payload {
            GeoPayload::Many(matches) => matches,
            GeoPayload::One(single) => vec![single],
        })
    }
}

impl std::fmt::Debug for GeocodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodeResolver")
            .field("base_url", &self.base_url)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageResolver for GeocodeResolver {
    type Input = LocationQuery;
    type Output = GeoMatch;

    fn name(&self) -> &str {
        "geocode"
    }

    async fn resolve(&self, query: &LocationQuery) -> Result<GeoMatch, ResolveError> {
        let appid = self.api_key.expose().to_string();
        let response = match query {
            LocationQuery::City { name } => {
                let url = format!("{}{DIRECT_PATH}", self.base_url);
                let params = [
                    ("q", name.trim().to_string()),
                    ("limit", self.limit.to_string()),
                    ("appid", appid),
                ];
                self.transport.get_json(&url, &params).await?
            }
            LocationQuery::PostalCode { zip, country } => {
                let url = format!("{}{ZIP_PATH}", self.base_url);
                let params = [
                    ("zip", format!("{},{}", zip.trim(), country.trim())),
                    ("appid", appid),
                ];
                let response = self.transport.get_json(&url, &params).await?;
                // Unknown postal codes come back as 404 rather than an empty list.
                if response.status == 404 {
                    debug!(%query, "Postal code not found");
                    return Err(ResolveError::NoMatch(query.to_string()));
                }
                response
            }
        };

        let matches = Self::parse_matches(response.into_success()?)?;
        debug!(%query, matches = matches.len(), "Geocode lookup finished");
        matches
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NoMatch(query.to_string()))
    }
}
