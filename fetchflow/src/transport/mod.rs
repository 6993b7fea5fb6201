//! HTTP transport used by the stage resolvers.
//!
//! Resolvers talk to providers through the [`HttpTransport`] trait so that
//! tests can substitute scripted responses for the network.

mod client;

pub use client::ReqwestTransport;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::errors::TransportError;

/// A JSON response from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body. `Null` when a non-success response had no JSON body.
    pub body: serde_json::Value,
}

impl JsonResponse {
    /// Creates a response with status 200.
    #[must_use]
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    /// Creates a response with the given status.
    #[must_use]
    pub fn with_status(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body, or a status error for non-2xx responses.
    pub fn into_success(self) -> Result<serde_json::Value, TransportError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(TransportError::Status {
                status: self.status,
            })
        }
    }

    /// Deserializes a 2xx body into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        let body = self.into_success()?;
        serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Protocol for JSON-over-HTTPS requests.
///
/// Exactly one attempt per call. Implementations must not put credentials
/// in the errors they return.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET request with the given query parameters.
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<JsonResponse, TransportError>;

    /// Issues a POST request with a JSON body and an optional bearer token.
    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<JsonResponse, TransportError>;
}
