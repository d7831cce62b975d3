//! Logical and wire-level request types

use serde_json::Value;

use crate::constants::JSON_CONTENT_TYPE;
use crate::impl_wire_name_conversions;

/// HTTP methods the client issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl_wire_name_conversions!(Method {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `Content-Type: application/json`
    Json(Value),
    /// Raw bytes; content type is left to the transport unless given
    Binary { data: Vec<u8>, content_type: Option<String> },
    /// `multipart/form-data`; the transport sets the boundary
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    /// Whether the body is sent as JSON
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// One field of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: FormValue::Text(value.into()) }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File { file_name: file_name.into(), data, content_type },
        }
    }
}

/// Value of a multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File { file_name: String, data: Vec<u8>, content_type: Option<String> },
}

/// Per-call flags supplied by callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Never attach a bearer token; a 401 is then an ordinary failure
    pub skip_auth: bool,
}

impl RequestOptions {
    pub fn skip_auth() -> Self {
        Self { skip_auth: true }
    }
}

/// The caller's intent before any header is attached
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<RequestBody>,
    pub skip_auth: bool,
}

impl LogicalRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, skip_auth: false }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.skip_auth = options.skip_auth;
        self
    }
}

/// Fully formed request ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl WireRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport result before any status interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, content_type, body: body.into() }
    }

    /// Convenience constructor for a JSON body
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, Some(JSON_CONTENT_TYPE.to_string()), body.to_string())
    }

    /// Whether the declared content type is JSON (including `+json` suffixes)
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|value| {
            let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            mime == JSON_CONTENT_TYPE || mime.ends_with("+json")
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_method_wire_names() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
    }

    #[test]
    fn test_logical_request_builders() {
        let request = LogicalRequest::new(Method::Post, "/auth/token/")
            .with_body(json!({"email": "a@b.com"}))
            .with_options(RequestOptions::skip_auth());

        assert!(request.skip_auth);
        assert!(request.body.as_ref().is_some_and(RequestBody::is_json));
    }

    #[test]
    fn test_wire_header_lookup_is_case_insensitive() {
        let wire = WireRequest {
            method: Method::Get,
            url: "http://localhost/users/me/".into(),
            headers: vec![("Authorization".into(), "Bearer A1".into())],
            body: None,
        };
        assert_eq!(wire.header("authorization"), Some("Bearer A1"));
        assert_eq!(wire.header("X-CSRFToken"), None);
    }

    #[test]
    fn test_raw_response_json_detection() {
        let with_charset =
            RawResponse::new(200, Some("application/json; charset=utf-8".into()), "{}");
        assert!(with_charset.is_json());

        let problem = RawResponse::new(400, Some("application/problem+json".into()), "{}");
        assert!(problem.is_json());

        let html = RawResponse::new(500, Some("text/html".into()), "<h1>oops</h1>");
        assert!(!html.is_json());
        assert!(!RawResponse::new(204, None, Vec::new()).is_json());
    }
}
