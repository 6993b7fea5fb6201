//! Process-wide configuration.
//!
//! Configuration is read once at startup and passed explicitly into the
//! resolver constructors. Credentials are wrapped in [`Credential`] so they
//! never appear in `Debug` output or logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ConfigError;

/// Environment variable holding the OpenWeather API key.
pub const WEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable holding the exchange-rate access key.
pub const EXCHANGE_API_KEY_ENV: &str = "EXCHANGE_RATE_API_KEY";
/// Environment variable holding the Bitly access token.
pub const BITLY_TOKEN_ENV: &str = "BITLY_ACCESS_TOKEN";

/// A secret value (API key or bearer token).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret for use in a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Geocoding and current-weather provider.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Exchange-rate provider.
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Link-shortening provider.
    #[serde(default)]
    pub shortener: ShortenerConfig,
    /// Shared HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` to read variables.
    ///
    /// Unset variables keep their defaults. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.weather.api_key = get(WEATHER_API_KEY_ENV).map(Credential::new);
        if let Some(url) = get("FETCHFLOW_WEATHER_BASE_URL") {
            config.weather.base_url = url;
        }
        if let Some(units) = get("FETCHFLOW_WEATHER_UNITS") {
            config.weather.units = Some(units);
        }

        config.currency.api_key = get(EXCHANGE_API_KEY_ENV).map(Credential::new);
        if let Some(url) = get("FETCHFLOW_CURRENCY_BASE_URL") {
            config.currency.base_url = url;
        }

        config.shortener.access_token = get(BITLY_TOKEN_ENV).map(Credential::new);
        if let Some(url) = get("FETCHFLOW_SHORTENER_BASE_URL") {
            config.shortener.base_url = url;
        }

        if let Some(raw) = get("FETCHFLOW_HTTP_TIMEOUT_SECONDS") {
            let seconds = raw
                .parse::<f64>()
                .map_err(|e| ConfigError::invalid("FETCHFLOW_HTTP_TIMEOUT_SECONDS", e.to_string()))?;
            config.http.timeout_seconds = Some(seconds);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::invalid("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("weather.base_url", &self.weather.base_url),
            ("currency.base_url", &self.currency.base_url),
            ("shortener.base_url", &self.shortener.base_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        }
        if let Some(seconds) = self.http.timeout_seconds {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(ConfigError::invalid(
                    "http.timeout_seconds",
                    "must be a positive number",
                ));
            }
        }
        if self.weather.geocode_limit == 0 {
            return Err(ConfigError::invalid("weather.geocode_limit", "must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for the OpenWeather geocoding and weather endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Provider root URL.
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// API key sent as `appid`.
    #[serde(default)]
    pub api_key: Option<Credential>,
    /// Unit system (`standard`, `metric`, `imperial`). Provider default when unset.
    #[serde(default)]
    pub units: Option<String>,
    /// Maximum number of geocode matches requested.
    #[serde(default = "default_geocode_limit")]
    pub geocode_limit: u32,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_geocode_limit() -> u32 {
    1
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            api_key: None,
            units: None,
            geocode_limit: default_geocode_limit(),
        }
    }
}

impl WeatherConfig {
    /// Returns the API key or an error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&Credential, ConfigError> {
        self.api_key.as_ref().ok_or_else(|| ConfigError::MissingCredential {
            env_var: WEATHER_API_KEY_ENV.to_string(),
        })
    }
}

/// Configuration for the exchange-rate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Latest-rates endpoint.
    #[serde(default = "default_currency_base_url")]
    pub base_url: String,
    /// Access key sent as `access_key`; omitted when unset.
    #[serde(default)]
    pub api_key: Option<Credential>,
}

fn default_currency_base_url() -> String {
    "https://open.er-api.com/v6/latest".to_string()
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            base_url: default_currency_base_url(),
            api_key: None,
        }
    }
}

/// Configuration for the Bitly shorten endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    /// Provider root URL.
    #[serde(default = "default_shortener_base_url")]
    pub base_url: String,
    /// Bearer token.
    #[serde(default)]
    pub access_token: Option<Credential>,
}

fn default_shortener_base_url() -> String {
    "https://api-ssl.bitly.com".to_string()
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            base_url: default_shortener_base_url(),
            access_token: None,
        }
    }
}

impl ShortenerConfig {
    /// Returns the access token or an error naming the variable to set.
    pub fn require_access_token(&self) -> Result<&Credential, ConfigError> {
        self.access_token
            .as_ref()
            .ok_or_else(|| ConfigError::MissingCredential {
                env_var: BITLY_TOKEN_ENV.to_string(),
            })
    }
}

/// Shared HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    concat!("fetchflow/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs_f64)
    }
}
