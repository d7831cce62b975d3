//! Application constants
//!
//! Header names, storage keys and user-facing fallback messages used by the
//! authenticated API client.

// Request timeouts
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Header names
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_ACCEPT: &str = "Accept";
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const BEARER_PREFIX: &str = "Bearer ";

// Persisted credential keys (suffixes appended to the configured namespace)
pub const DEFAULT_STORAGE_NAMESPACE: &str = "lessonlink.auth";
pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_EXPIRY_HINT: &str = "expiry_hint";
pub const KEY_USER: &str = "user";

// Backend endpoints
pub const DEFAULT_TOKEN_PATH: &str = "/auth/token/";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/token/refresh/";
pub const DEFAULT_REGISTER_PATH: &str = "/auth/register/";
pub const DEFAULT_PROFILE_PATH: &str = "/users/me/";
pub const DEFAULT_LOGIN_REDIRECT_PATH: &str = "/login";

// User-facing messages
pub const MSG_NETWORK_FAILURE: &str = "Network error. Please check your connection and try again.";
pub const MSG_MALFORMED_RESPONSE: &str = "The server returned an unexpected response.";
pub const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Plain-text error bodies longer than this are not shown to users.
pub const MAX_TEXT_ERROR_LENGTH: usize = 200;
