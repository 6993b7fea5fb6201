//! Weather pipeline data model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;
use crate::stages::Validate;

/// Location descriptor accepted by the geocode stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationQuery {
    /// Free-text place name, e.g. "Paris".
    City {
        /// Place name as typed.
        name: String,
    },
    /// Postal code within a country.
    PostalCode {
        /// Postal code.
        zip: String,
        /// ISO 3166 country code.
        country: String,
    },
}

impl LocationQuery {
    /// Creates a free-text query.
    #[must_use]
    pub fn city(name: impl Into<String>) -> Self {
        Self::City { name: name.into() }
    }

    /// Creates a postal-code query.
    #[must_use]
    pub fn postal_code(zip: impl Into<String>, country: impl Into<String>) -> Self {
        Self::PostalCode {
            zip: zip.into(),
            country: country.into(),
        }
    }
}

impl Validate for LocationQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::City { name } if name.trim().is_empty() => Err(ValidationError::empty("city")),
            Self::PostalCode { zip, .. } if zip.trim().is_empty() => {
                Err(ValidationError::empty("zip"))
            }
            Self::PostalCode { country, .. } if country.trim().is_empty() => {
                Err(ValidationError::empty("country"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::City { name } => write!(f, "\"{}\"", name.trim()),
            Self::PostalCode { zip, country } => {
                write!(f, "postal code {} ({})", zip.trim(), country.trim())
            }
        }
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// One location record returned by the geocode provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMatch {
    /// Place name.
    #[serde(default)]
    pub name: Option<String>,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Country code.
    #[serde(default)]
    pub country: Option<String>,
    /// State or region.
    #[serde(default)]
    pub state: Option<String>,
}

impl GeoMatch {
    /// Returns the coordinate pair.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Current conditions at a location.
///
/// Every field is optional: the provider payload is not validated, so a
/// field missing upstream is simply absent here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Location name reported by the provider.
    pub location: Option<String>,
    /// Temperature, in the configured unit system.
    pub temperature: Option<f64>,
    /// Perceived temperature.
    pub feels_like: Option<f64>,
    /// Condition description, e.g. "clear sky".
    pub description: Option<String>,
    /// Provider icon id, e.g. "01d".
    pub icon: Option<String>,
    /// Relative humidity in percent.
    pub humidity: Option<u64>,
    /// Wind speed.
    pub wind_speed: Option<f64>,
    /// Cloud cover in percent.
    pub cloudiness: Option<u64>,
}

impl WeatherSnapshot {
    /// Reads a snapshot out of a current-weather payload.
    #[must_use]
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        let text = |path: &str| {
            payload
                .pointer(path)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        let number = |path: &str| payload.pointer(path).and_then(serde_json::Value::as_f64);
        let count = |path: &str| payload.pointer(path).and_then(serde_json::Value::as_u64);

        Self {
            location: text("/name"),
            temperature: number("/main/temp"),
            feels_like: number("/main/feels_like"),
            description: text("/weather/0/description"),
            icon: text("/weather/0/icon"),
            humidity: count("/main/humidity"),
            wind_speed: number("/wind/speed"),
            cloudiness: count("/clouds/all"),
        }
    }

    /// Returns the provider's icon image URL.
    #[must_use]
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|icon| format!("https://openweathermap.org/img/w/{icon}.png"))
    }
}

fn or_na<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "n/a".to_string(), ToString::to_string)
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Weather in {}", or_na(self.location.as_ref()))?;
        writeln!(f, "Temperature: {}", or_na(self.temperature.as_ref()))?;
        writeln!(f, "Feels Like: {}", or_na(self.feels_like.as_ref()))?;
        writeln!(f, "Description: {}", or_na(self.description.as_ref()))?;
        writeln!(f, "Humidity: {}%", or_na(self.humidity.as_ref()))?;
        writeln!(f, "Wind Speed: {} m/s", or_na(self.wind_speed.as_ref()))?;
        write!(f, "Cloudiness: {}%", or_na(self.cloudiness.as_ref()))
    }
}
