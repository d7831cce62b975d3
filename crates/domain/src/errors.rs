//! Error types used throughout the application

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_wire_name_conversions;

/// Main error type for LessonLink infrastructure operations
///
/// Request failures never use this type; they are reported as values inside
/// [`crate::NormalizedResponse`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LessonLinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for LessonLink operations
pub type Result<T> = std::result::Result<T, LessonLinkError>;

/// Why a request failed, as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The backend could not be reached (DNS, refused connection, timeout)
    Network,
    /// The backend answered with a non-success status
    Backend,
    /// The backend answered with a body that could not be parsed
    MalformedResponse,
    /// The session could not be refreshed; the user must log in again
    SessionExpired,
}

impl_wire_name_conversions!(ErrorKind {
    Network => "network",
    Backend => "backend",
    MalformedResponse => "malformed_response",
    SessionExpired => "session_expired",
});

/// Request failure with its diagnostic payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Malformed response (status {status}): {reason}")]
    MalformedResponse { status: u16, reason: String, raw: String },

    #[error("Session expired")]
    SessionExpired,
}

impl ApiError {
    /// Get the caller-facing kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorKind::Network,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::SessionExpired => ErrorKind::SessionExpired,
        }
    }

    /// HTTP status associated with the failure (`0` when nothing was received)
    pub fn status(&self) -> u16 {
        match self {
            Self::Network(_) | Self::Timeout(_) => 0,
            Self::Backend { status, .. } | Self::MalformedResponse { status, .. } => *status,
            Self::SessionExpired => 401,
        }
    }
}
