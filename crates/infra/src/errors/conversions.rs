//! Conversions from external infrastructure errors into domain errors.

use std::time::Duration;

use lessonlink_core::TransportError;
use lessonlink_domain::LessonLinkError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LessonLinkError);

impl From<InfraError> for LessonLinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LessonLinkError> for InfraError {
    fn from(value: LessonLinkError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoLessonLinkError {
    fn into_lessonlink(self) -> LessonLinkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LessonLinkError / TransportError */
/* -------------------------------------------------------------------------- */

impl IntoLessonLinkError for HttpError {
    fn into_lessonlink(self) -> LessonLinkError {
        if self.is_builder() {
            LessonLinkError::Config(format!("invalid HTTP client configuration: {self}"))
        } else {
            LessonLinkError::Network(self.to_string())
        }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_lessonlink())
    }
}

/// Classify a failed wire call
///
/// Timeouts keep the configured budget so callers can report it; every other
/// failure (DNS, refused connection, TLS, reset) is a network error.
pub fn transport_error(err: &HttpError, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → LessonLinkError */
/* -------------------------------------------------------------------------- */

impl IntoLessonLinkError for std::io::Error {
    fn into_lessonlink(self) -> LessonLinkError {
        LessonLinkError::Storage(format!("{:?}: {self}", self.kind()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        Self(value.into_lessonlink())
    }
}

impl IntoLessonLinkError for serde_json::Error {
    fn into_lessonlink(self) -> LessonLinkError {
        LessonLinkError::Storage(format!("invalid credential file: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        Self(value.into_lessonlink())
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → LessonLinkError */
/* -------------------------------------------------------------------------- */

#[cfg(feature = "keychain")]
impl IntoLessonLinkError for keyring::Error {
    fn into_lessonlink(self) -> LessonLinkError {
        use keyring::Error as KeyringError;

        let description = self.to_string();

        match self {
            KeyringError::NoEntry => LessonLinkError::Storage("keychain entry not found".into()),
            KeyringError::BadEncoding(_) => {
                LessonLinkError::Storage("credential in keychain is not valid UTF-8".into())
            }
            KeyringError::TooLong(name, limit) => LessonLinkError::Storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            KeyringError::PlatformFailure(err) => {
                LessonLinkError::Storage(format!("keychain platform error: {err}"))
            }
            KeyringError::NoStorageAccess(err) => {
                LessonLinkError::Storage(format!("unable to access secure storage: {err}"))
            }
            _ => LessonLinkError::Storage(description),
        }
    }
}

#[cfg(feature = "keychain")]
impl From<keyring::Error> for InfraError {
    fn from(value: keyring::Error) -> Self {
        Self(value.into_lessonlink())
    }
}
