use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ReplayError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid store name: {0}")]
    InvalidStoreName(String),

    #[error("Corrupt entry in {queue}: {key} -> {value}")]
    CorruptEntry {
        queue: String,
        key: String,
        value: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ReplayError>;

impl From<std::io::Error> for ReplayError {
    fn from(e: std::io::Error) -> Self {
        ReplayError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        ReplayError::Json(e.to_string())
    }
}

impl From<url::ParseError> for ReplayError {
    fn from(e: url::ParseError) -> Self {
        ReplayError::InvalidUrl(e.to_string())
    }
}

impl From<reqwest::Error> for ReplayError {
    fn from(e: reqwest::Error) -> Self {
        ReplayError::Network(e.to_string())
    }
}

impl ReplayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReplayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReplayError::InvalidStoreName(_) => StatusCode::BAD_REQUEST,
            ReplayError::CorruptEntry { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ReplayError::Network(_) => StatusCode::BAD_GATEWAY,
            ReplayError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ReplayError::InvalidMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            ReplayError::UnknownQueue(_) => StatusCode::NOT_FOUND,
            ReplayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReplayError::Json(_) => StatusCode::BAD_REQUEST,
            ReplayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for ReplayError {
    fn into_response(self) -> Response {
        let (error_code, suggestion) = match &self {
            ReplayError::Store(_) => ("store_error", None),
            ReplayError::InvalidStoreName(_) => (
                "invalid_store_name",
                Some("Store names may only contain letters, digits, '-' and '_'"),
            ),
            ReplayError::CorruptEntry { .. } => ("corrupt_entry", None),
            ReplayError::Network(_) => (
                "network_error",
                Some("Check that the upstream is reachable"),
            ),
            ReplayError::InvalidUrl(_) => ("invalid_url", None),
            ReplayError::InvalidMethod(_) => ("invalid_method", None),
            ReplayError::UnknownQueue(_) => (
                "unknown_queue",
                Some("Known queues are offline-analytics and offline-session-updates"),
            ),
            ReplayError::Io(_) => ("io_error", None),
            ReplayError::Json(_) => ("json_error", None),
            ReplayError::Config(_) => (
                "config_error",
                Some("Check the REPLAYQ_* environment variables"),
            ),
        };

        let body = ErrorResponse {
            error: error_code.to_string(),
            message: self.to_string(),
            suggestion: suggestion.map(str::to_string),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
