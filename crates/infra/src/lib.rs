//! # LessonLink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP transport (reqwest) and the cookie-jar CSRF source
//! - Credential backends (JSON file, optional platform keychain)
//! - Configuration loading (`.env`, environment, config files)
//! - Tracing subscriber setup
//! - Client bootstrap and session events for UI listeners
//!
//! ## Architecture
//! - Implements traits defined in `lessonlink-core`
//! - Depends on `lessonlink-domain` and `lessonlink-core`
//! - Contains all "impure" code (network, filesystem, keychain)

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod session_events;
pub mod storage;

// Re-export commonly used items
pub use bootstrap::{build_client, build_client_from_env, ClientHandle};
pub use errors::InfraError;
pub use http::{JarCsrfSource, ReqwestTransport, ReqwestTransportBuilder};
pub use observability::init_tracing;
pub use session_events::{BroadcastLoginRedirect, SessionEvent};
pub use storage::{open_backend, JsonFileStore};
