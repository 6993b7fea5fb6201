//! URL shortening.
//!
//! A single lookup, run through the same controller as the two-stage
//! pipelines with [`Passthrough`] as its second stage.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Credential, ShortenerConfig};
use crate::errors::{ConfigError, ResolveError, TransportError, ValidationError};
use crate::pipeline::PipelineController;
use crate::stages::{Passthrough, StageResolver, Validate};
use crate::transport::HttpTransport;

const SHORTEN_PATH: &str = "/v4/shorten";

/// Message shown for an invalid long URL.
pub const INVALID_URL_MESSAGE: &str = "Invalid URL. Please enter a valid URL";

/// Message shown when the provider rejects a shorten request.
pub const SHORTEN_FAILED_MESSAGE: &str = "Failed to shorten URL";

/// URL to shorten. Must be absolute with an `http` or `https` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LongUrl(pub String);

impl LongUrl {
    /// Wraps a raw URL string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the URL as typed, without surrounding whitespace.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.trim()
    }
}

impl Validate for LongUrl {
    fn validate(&self) -> Result<(), ValidationError> {
        match Url::parse(self.as_str()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ValidationError::new("url", INVALID_URL_MESSAGE)),
        }
    }
}

impl fmt::Display for LongUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shortened link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    /// Short identifier, e.g. "bit.ly/3abcDEF".
    pub id: String,
    /// Full short URL, when the provider includes it.
    #[serde(default)]
    pub link: Option<String>,
}

impl fmt::Display for ShortLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.link.as_deref().unwrap_or(&self.id))
    }
}

/// Posts a long URL to the shortening provider.
pub struct ShortenResolver {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    access_token: Credential,
}

impl ShortenResolver {
    /// Creates a resolver; fails if no access token is configured.
    pub fn new(config: &ShortenerConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, ConfigError> {
        Ok(Self {
            transport,
            endpoint: format!("{}{SHORTEN_PATH}", config.base_url.trim_end_matches('/')),
            access_token: config.require_access_token()?.clone(),
        })
    }
}

impl fmt::Debug for ShortenResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortenResolver")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageResolver for ShortenResolver {
    type Input = LongUrl;
    type Output = ShortLink;

    fn name(&self) -> &str {
        "shorten"
    }

    async fn resolve(&self, url: &LongUrl) -> Result<ShortLink, ResolveError> {
        let body = serde_json::json!({ "long_url": url.as_str() });
        let link: ShortLink = self
            .transport
            .post_json(&self.endpoint, Some(self.access_token.expose()), &body)
            .await?
            .decode()?;
        debug!(id = %link.id, "URL shortened");
        Ok(link)
    }

    fn failure_message(&self, error: &ResolveError) -> String {
        match error {
            ResolveError::Transport(TransportError::Status { .. }) => {
                SHORTEN_FAILED_MESSAGE.to_string()
            }
            other => other.user_message(),
        }
    }
}

/// Controller type for the shortener.
pub type ShortenerPipeline = PipelineController<ShortenResolver, Passthrough<ShortLink>>;

/// Builds a shortener pipeline over `transport`.
pub fn shortener_pipeline(
    config: &ShortenerConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<ShortenerPipeline, ConfigError> {
    let resolver = ShortenResolver::new(config, transport)?;
    Ok(PipelineController::new("shortener", resolver, Passthrough::new()))
}
