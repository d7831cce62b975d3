//! Pure request builder
//!
//! Turns a [`LogicalRequest`] plus a session snapshot into a
//! [`WireRequest`]. No I/O, never fails.

use lessonlink_domain::constants::{
    BEARER_PREFIX, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use lessonlink_domain::{LogicalRequest, RequestBody, Session, WireRequest};

/// Composes URLs and headers for logical requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBuilder {
    base_url: String,
    csrf_header: String,
}

impl RequestBuilder {
    /// Trailing slashes on `base_url` are dropped
    pub fn new(base_url: impl Into<String>, csrf_header: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, csrf_header: csrf_header.into() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the wire request
    ///
    /// - `Content-Type: application/json` unless the body is binary or
    ///   multipart, whose content type the transport sets
    /// - `Authorization: Bearer <token>` iff the session has an access token
    ///   and `skip_auth` is false
    /// - the anti-forgery header whenever `csrf_token` is present
    pub fn build(
        &self,
        request: &LogicalRequest,
        session: &Session,
        csrf_token: Option<&str>,
    ) -> WireRequest {
        let mut headers = vec![(HEADER_ACCEPT.to_string(), JSON_CONTENT_TYPE.to_string())];

        match &request.body {
            None | Some(RequestBody::Json(_)) => {
                headers.push((HEADER_CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
            }
            Some(RequestBody::Binary { .. } | RequestBody::Multipart(_)) => {}
        }

        if !request.skip_auth {
            if let Some(token) = session.access_token() {
                headers.push((HEADER_AUTHORIZATION.to_string(), format!("{BEARER_PREFIX}{token}")));
            }
        }

        if let Some(token) = csrf_token.filter(|token| !token.is_empty()) {
            headers.push((self.csrf_header.clone(), token.to_string()));
        }

        WireRequest {
            method: request.method,
            url: self.url_for(&request.path),
            headers,
            body: request.body.clone(),
        }
    }

    /// Join a request path onto the base URL; absolute URLs pass through
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}
