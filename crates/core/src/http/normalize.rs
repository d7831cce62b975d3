//! Response normalization
//!
//! Parses raw transport responses and maps them onto [`NormalizedResponse`].
//! The 401-expiry decision is not made here; the orchestrator inspects the
//! status before normalizing.

use lessonlink_domain::constants::{MAX_TEXT_ERROR_LENGTH, MSG_MALFORMED_RESPONSE};
use lessonlink_domain::{ApiError, NormalizedResponse, RawResponse, ResponseData};
use serde_json::Value;

/// Message fields checked in order before falling back to field errors
const MESSAGE_FIELDS: [&str; 3] = ["detail", "message", "error"];

/// Parse a response body according to its declared content type
///
/// # Errors
///
/// Returns [`ApiError::MalformedResponse`] with the raw text attached when a
/// JSON content type carries an unparseable body.
pub fn parse_body(response: &RawResponse) -> Result<ResponseData, ApiError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ResponseData::Empty);
    }

    let text = String::from_utf8_lossy(&response.body);
    if !response.is_json() {
        return Ok(ResponseData::Text(text.into_owned()));
    }

    serde_json::from_slice::<Value>(&response.body).map(ResponseData::Json).map_err(|err| {
        ApiError::MalformedResponse {
            status: response.status,
            reason: err.to_string(),
            raw: text.into_owned(),
        }
    })
}

/// User-presentable message for a failed response
///
/// Prefers a backend-supplied detail, then the first validation error, then
/// a short plain-text body, then a generic message naming the status.
pub fn error_message(status: u16, data: &ResponseData) -> String {
    let extracted = match data {
        ResponseData::Json(body) => json_message(body),
        ResponseData::Text(text) => {
            let text = text.trim();
            (!text.is_empty() && text.len() <= MAX_TEXT_ERROR_LENGTH && !looks_like_markup(text))
                .then(|| text.to_string())
        }
        ResponseData::Empty => None,
    };

    extracted.unwrap_or_else(|| format!("Request failed with status {status}"))
}

/// Normalize a completed wire call
///
/// 2xx statuses are successes; everything else is a backend failure carrying
/// the extracted message.
pub fn normalize(response: RawResponse) -> NormalizedResponse {
    let data = match parse_body(&response) {
        Ok(data) => data,
        Err(err) => {
            let raw = match &err {
                ApiError::MalformedResponse { raw, .. } => ResponseData::Text(raw.clone()),
                _ => ResponseData::Empty,
            };
            return NormalizedResponse::failure(err, raw, MSG_MALFORMED_RESPONSE);
        }
    };

    if response.is_success() {
        return NormalizedResponse::success(response.status, data);
    }

    let message = error_message(response.status, &data);
    NormalizedResponse::failure(
        ApiError::Backend { status: response.status, message: message.clone() },
        data,
        message,
    )
}

fn json_message(body: &Value) -> Option<String> {
    if let Some(text) = body.as_str().filter(|text| !text.trim().is_empty()) {
        return Some(text.to_string());
    }

    let object = body.as_object()?;

    MESSAGE_FIELDS
        .iter()
        .filter_map(|field| object.get(*field))
        .find_map(first_text)
        .or_else(|| object.get("non_field_errors").and_then(first_text))
        .or_else(|| {
            object.iter().find_map(|(field, value)| {
                first_text(value).map(|message| format!("{field}: {message}"))
            })
        })
}

/// First non-empty string in a value that is a string or a list of them
fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn looks_like_markup(text: &str) -> bool {
    text.starts_with('<')
}
