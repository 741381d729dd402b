//! Error types for groundsense
//!
//! `AppError` implements `IntoResponse` for Axum handlers. `GenerationError`
//! describes a single generative request and the outcome of a fallback run.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::router::RuleError;
use crate::states::AtlasError;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Response catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Routing table error: {0}")]
    Rules(#[from] RuleError),

    #[error("State data error: {0}")]
    Atlas(#[from] AtlasError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Generative answers unavailable: {0}")]
    GenerationUnavailable(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::GenerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Catalog(_)
            | Self::Rules(_)
            | Self::Atlas(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Failure of a generative request against one or more candidate models
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Upstream reported that the requested model does not exist.
    /// The only retryable kind: the next candidate model is tried.
    #[error("Model {model} not found: {message}")]
    ModelNotFound { model: String, message: String },

    /// Upstream returned an error envelope that is not "model not found"
    /// (authentication, quota, malformed request, ...)
    #[error("Generation with {model} failed: {message}")]
    Api { model: String, message: String },

    #[error("Request to {model} timed out after {timeout_seconds} seconds")]
    Timeout { model: String, timeout_seconds: u64 },

    #[error("Transport error calling {model}: {message}")]
    Transport { model: String, message: String },

    #[error("Invalid response from {model}: {reason}")]
    InvalidResponse { model: String, reason: String },

    /// Every candidate reported "model not found"; `last` is the final one
    #[error("All {attempts} candidate models unavailable; last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<GenerationError>,
    },

    /// Every candidate had already been attempted by this client
    #[error("No untried candidate models remain")]
    NoCandidates,
}

impl GenerationError {
    /// Whether the fallback client may advance to the next candidate
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ModelNotFound { .. } => true,
            Self::Api { .. }
            | Self::Timeout { .. }
            | Self::Transport { .. }
            | Self::InvalidResponse { .. }
            | Self::Exhausted { .. }
            | Self::NoCandidates => false,
        }
    }

    /// Model the error is attributed to (the last candidate for `Exhausted`)
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::ModelNotFound { model, .. }
            | Self::Api { model, .. }
            | Self::Timeout { model, .. }
            | Self::Transport { model, .. }
            | Self::InvalidResponse { model, .. } => Some(model),
            Self::Exhausted { last, .. } => last.model(),
            Self::NoCandidates => None,
        }
    }

    fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
