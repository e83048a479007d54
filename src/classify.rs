//! Decides whether a delivery attempt counts as done or should be retried.
//!
//! A response with status >= 500 or no response at all is retryable.
//! Everything else, 4xx included, is terminal: client errors are never retried.

use crate::error::Result;
use crate::transport::TransportResponse;
use http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The upstream answered with a non-server-error status.
    Delivered(StatusCode),
    /// Server error or network failure; the reason is for logs only.
    Retryable(String),
}

impl Delivery {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Delivery::Retryable(_))
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status.as_u16() >= 600
}

pub fn classify(result: &Result<TransportResponse>) -> Delivery {
    match result {
        Ok(response) if is_retryable_status(response.status) => {
            Delivery::Retryable(format!("upstream returned {}", response.status))
        }
        Ok(response) => Delivery::Delivered(response.status),
        Err(e) => Delivery::Retryable(e.to_string()),
    }
}
