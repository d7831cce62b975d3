//! Login credentials and token endpoint payloads

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last-known user profile
///
/// The backend owns the user shape, so the profile is kept as raw JSON.
pub type UserProfile = Value;

/// Email/password pair sent to the token endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fields extracted from a token or refresh endpoint response
///
/// Only the fields this client needs are read; anything else the backend
/// sends is ignored.
#[derive(Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    /// Extract a grant from an arbitrary JSON body
    ///
    /// Accepts `access`/`access_token`, `refresh`/`refresh_token`, an optional
    /// `expires_in` and an optional `user` object. Returns `None` when no
    /// access token is present.
    pub fn from_json(body: &Value) -> Option<Self> {
        let access_token = string_field(body, &["access", "access_token", "token"])?;
        let refresh_token = string_field(body, &["refresh", "refresh_token"]);
        let expires_in = body.get("expires_in").and_then(Value::as_i64);
        let user = body.get("user").filter(|user| user.is_object()).cloned();

        Some(Self { access_token, refresh_token, expires_in, user })
    }

    /// Absolute expiry computed from `expires_in`, if the backend sent one
    pub fn expiry_hint(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = self.expires_in.filter(|secs| *secs > 0)?;
        Duration::try_seconds(secs).and_then(|ttl| now.checked_add_signed(ttl))
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("user", &self.user.is_some())
            .finish()
    }
}

fn string_field(body: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| body.get(name).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
