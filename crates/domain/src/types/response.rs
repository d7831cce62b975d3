//! Normalized response returned to callers

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{ApiError, ErrorKind};

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// JSON view of the body; text becomes a JSON string, empty becomes null
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Empty => Value::Null,
        }
    }
}

/// Outcome of one logical request
///
/// Created fresh per call and never mutated after it is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub success: bool,
    pub status: u16,
    pub data: ResponseData,
    /// User-presentable message for failures
    pub error_message: Option<String>,
    /// Typed failure reason with diagnostics
    pub error: Option<ApiError>,
}

impl NormalizedResponse {
    pub fn success(status: u16, data: ResponseData) -> Self {
        Self { success: true, status, data, error_message: None, error: None }
    }

    pub fn failure(error: ApiError, data: ResponseData, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: error.status(),
            data,
            error_message: Some(message.into()),
            error: Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(ApiError::kind)
    }

    pub fn is_session_expired(&self) -> bool {
        self.error_kind() == Some(ErrorKind::SessionExpired)
    }

    /// Convert into the body on success or the typed error on failure
    pub fn into_result(self) -> Result<ResponseData, ApiError> {
        match self.error {
            Some(error) => Err(error),
            None if self.success => Ok(self.data),
            None => Err(ApiError::Backend {
                status: self.status,
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }

    /// Deserialize a successful body into `T`
    ///
    /// # Errors
    ///
    /// Returns the request's own error on failure, or
    /// [`ApiError::MalformedResponse`] when the body does not fit `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let status = self.status;
        let value = self.into_result()?.into_json();
        serde_json::from_value(value.clone()).map_err(|err| ApiError::MalformedResponse {
            status,
            reason: err.to_string(),
            raw: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        email: String,
    }

    #[test]
    fn test_success_into_typed_json() {
        let response =
            NormalizedResponse::success(200, ResponseData::Json(json!({"email": "a@b.com"})));
        let profile: Profile = response.json().unwrap();
        assert_eq!(profile, Profile { email: "a@b.com".into() });
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let response = NormalizedResponse::success(200, ResponseData::Json(json!([1, 2])));
        let err = response.json::<Profile>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_failure_carries_status_and_kind() {
        let response = NormalizedResponse::failure(
            ApiError::Backend { status: 403, message: "Forbidden".into() },
            ResponseData::Json(json!({"detail": "Forbidden"})),
            "Forbidden",
        );
        assert!(!response.success);
        assert_eq!(response.status, 403);
        assert_eq!(response.error_kind(), Some(ErrorKind::Backend));
        assert!(!response.is_session_expired());
        assert!(response.into_result().is_err());
    }

    #[test]
    fn test_empty_body_becomes_null() {
        let response = NormalizedResponse::success(204, ResponseData::Empty);
        assert!(response.json::<()>().is_ok());
    }
}
