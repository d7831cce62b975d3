//! Session credentials held by the credential store

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};

/// Access/refresh token pair with an optional expiry hint
///
/// Fields are private so that a session holding a refresh token always holds
/// an access token too. Tokens are redacted from `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expiry_hint: Option<DateTime<Utc>>,
}

impl Session {
    /// A session with no credentials (logged out)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A logged-in session
    #[must_use]
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry_hint: Option<DateTime<Utc>>,
    ) -> Self {
        let access_token = access_token.into();
        let expiry_hint = expiry_hint.or_else(|| jwt_expiry(&access_token));
        Self { access_token: Some(access_token), refresh_token, expiry_hint }
    }

    /// Bearer token sent with authenticated requests
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Token exchanged for a new access token once the current one expires
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// When the access token is expected to expire, if known
    pub fn expiry_hint(&self) -> Option<DateTime<Utc>> {
        self.expiry_hint
    }

    /// Whether an access token is held
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Session after a successful refresh
    ///
    /// The refresh token is replaced only when the backend rotated it.
    #[must_use]
    pub fn refreshed(
        &self,
        access_token: impl Into<String>,
        rotated_refresh_token: Option<String>,
        expiry_hint: Option<DateTime<Utc>>,
    ) -> Self {
        Self::authenticated(
            access_token,
            rotated_refresh_token.or_else(|| self.refresh_token.clone()),
            expiry_hint,
        )
    }

    /// Whether the expiry hint says the access token is already stale at `now`
    ///
    /// Returns `false` when the expiry is unknown.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_hint.is_some_and(|expiry| expiry <= now)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expiry_hint", &self.expiry_hint)
            .finish()
    }
}

/// Read the `exp` claim of a JWT without verifying its signature
///
/// Only used as a hint; returns `None` for opaque (non-JWT) tokens.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"user_id":7}}"#));
        format!("{header}.{claims}.signature")
    }

    #[test]
    fn test_empty_session_has_no_tokens() {
        let session = Session::empty();
        assert!(!session.is_authenticated());
        assert_eq!(session.access_token(), None);
        assert_eq!(session.refresh_token(), None);
        assert_eq!(session.expiry_hint(), None);
    }

    #[test]
    fn test_refreshed_keeps_refresh_token_unless_rotated() {
        let session = Session::authenticated("A1", Some("R1".into()), None);

        let kept = session.refreshed("A2", None, None);
        assert_eq!(kept.access_token(), Some("A2"));
        assert_eq!(kept.refresh_token(), Some("R1"));

        let rotated = session.refreshed("A3", Some("R2".into()), None);
        assert_eq!(rotated.refresh_token(), Some("R2"));
    }

    #[test]
    fn test_expiry_hint_from_jwt() {
        let exp = Utc::now().timestamp() + 300;
        let session = Session::authenticated(jwt_with_exp(exp), None, None);
        assert_eq!(session.expiry_hint().map(|t| t.timestamp()), Some(exp));
        assert!(!session.is_expired_at(Utc::now()));
        assert!(session.is_expired_at(Utc::now() + Duration::seconds(600)));
    }

    #[test]
    fn test_explicit_expiry_wins_over_jwt_claim() {
        let explicit = Utc.timestamp_opt(1_700_000_000, 0).single();
        let session = Session::authenticated(jwt_with_exp(42), None, explicit);
        assert_eq!(session.expiry_hint(), explicit);
    }

    #[test]
    fn test_opaque_token_has_unknown_expiry() {
        assert_eq!(jwt_expiry("A1"), None);
        assert_eq!(jwt_expiry("a.b.c"), None);
        assert!(!Session::authenticated("A1", None, None).is_expired_at(Utc::now()));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let session = Session::authenticated("secret-access", Some("secret-refresh".into()), None);
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("<redacted>"));
    }
}
