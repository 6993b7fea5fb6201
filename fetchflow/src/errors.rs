//! Error types for the fetchflow crate.
//!
//! Errors are scoped to a single pipeline run. Nothing here is fatal to the
//! process: resolver failures are converted by the controller into a terminal
//! [`PipelineFailure`](crate::core::PipelineFailure), and validation failures
//! suppress the run before any resolver is invoked.

use crate::core::FailureKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic message shown for any transport-level failure.
pub const GENERIC_FETCH_MESSAGE: &str = "An error occurred while fetching data.";

/// The main error type for fetchflow operations outside a pipeline run.
#[derive(Debug, Error)]
pub enum FetchflowError {
    /// Raw input was rejected.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A stage resolver failed.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// The HTTP layer failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Raw input is absent or malformed.
///
/// A run started with invalid input is suppressed entirely and never reaches
/// a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: String,
    /// User-displayable message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an error for a required field that was left empty.
    #[must_use]
    pub fn empty(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{field} must not be empty");
        Self { field, message }
    }
}

/// Failure reported by a stage resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The upstream provider answered with zero results.
    #[error("no match for {0}")]
    NoMatch(String),

    /// The request could not be completed or its body could not be read.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl ResolveError {
    /// Returns the failure kind used in the terminal error state.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoMatch(_) => FailureKind::NoMatch,
            Self::Transport(_) => FailureKind::Transport,
        }
    }

    /// Returns a short message suitable for display.
    ///
    /// Transport details are never surfaced; they may mention hosts or
    /// provider internals.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoMatch(query) => format!("No results found for {query}."),
            Self::Transport(_) => GENERIC_FETCH_MESSAGE.to_string(),
        }
    }
}

/// Errors raised by an [`HttpTransport`](crate::transport::HttpTransport).
///
/// Messages are built from errors stripped of their request URL, so query
/// string credentials never end up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The configured request timeout elapsed.
    #[error("request timed out")]
    Timeout,
}

impl TransportError {
    /// Converts a reqwest error, dropping the URL it carries.
    #[must_use]
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        let err = err.without_url();
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A credential required by a provider was not supplied.
    #[error("missing credential: set {env_var}")]
    MissingCredential {
        /// Environment variable expected to hold the credential.
        env_var: String,
    },

    /// A configuration value could not be parsed.
    #[error("invalid configuration value for {key}: {message}")]
    Invalid {
        /// Configuration key.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
