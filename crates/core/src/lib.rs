//! # LessonLink Core
//!
//! The authenticated API client, independent of any concrete HTTP stack or
//! storage medium.
//!
//! This crate contains:
//! - Port interfaces (transport, key-value persistence, CSRF cookie source,
//!   login redirect)
//! - The credential store and the single-flight session refresher
//! - The pure request builder and response normalization
//! - The request orchestrator (`ApiClient`)
//!
//! ## Architecture Principles
//! - Only depends on `lessonlink-domain`
//! - No reqwest, filesystem or keychain code
//! - All external dependencies via traits

pub mod api;
pub mod auth;
pub mod http;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use api::{ApiClient, ApiClientBuilder};
pub use auth::ports::{CsrfTokenSource, KeyValueStore, LoginRedirect, LoggingLoginRedirect};
pub use auth::refresher::{RefreshOutcome, SessionRefresher};
pub use auth::store::{CredentialStore, InMemoryKeyValueStore};
pub use http::normalize::{error_message, normalize, parse_body};
pub use http::ports::{Transport, TransportError};
pub use http::request_builder::RequestBuilder;
