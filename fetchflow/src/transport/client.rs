//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::{HttpTransport, JsonResponse};
use crate::config::HttpConfig;
use crate::errors::{ConfigError, TransportError};

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Builds a transport from HTTP configuration.
    ///
    /// No timeout is applied unless one is configured.
    pub fn from_config(config: &HttpConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ConfigError::Client(e.without_url().to_string()))?;
        Ok(Self { http })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn send(request: RequestBuilder) -> Result<JsonResponse, TransportError> {
        let response = request.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(TransportError::from_reqwest)?;
        debug!(status = status.as_u16(), bytes = text.len(), "Response received");

        let body = if status.is_success() {
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::Null)
        };
        Ok(JsonResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<JsonResponse, TransportError> {
        Self::send(self.http.get(url).query(query)).await
    }

    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<JsonResponse, TransportError> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::send(request).await
    }
}
