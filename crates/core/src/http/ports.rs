//! Transport port
//!
//! The transport performs the network call and reports only whether the
//! call completed. Status codes are interpreted by the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use lessonlink_domain::{ApiError, RawResponse, WireRequest};
use thiserror::Error;

/// Failure to complete a wire call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// DNS failure, refused or reset connection, TLS failure
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(message) => Self::Network(message),
            TransportError::Timeout(timeout) => Self::Timeout(timeout),
        }
    }
}

/// Performs HTTP calls
///
/// Implementations enforce the request timeout and must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a fully built request and return the raw response
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError>;
}
