//! Wiring of the production client
//!
//! Connects the reqwest transport, the shared cookie jar, the CSRF source,
//! the configured credential backend and the broadcast login redirect.

use std::sync::Arc;

use lessonlink_core::{ApiClient, CredentialStore};
use lessonlink_domain::{Config, Result};
use reqwest::cookie::Jar;
use tokio::sync::broadcast;
use tracing::info;

use crate::http::{JarCsrfSource, ReqwestTransport};
use crate::session_events::{BroadcastLoginRedirect, SessionEvent};
use crate::storage::open_backend;

/// A ready client plus the channel its session events arrive on
#[derive(Debug, Clone)]
pub struct ClientHandle {
    client: ApiClient,
    events: BroadcastLoginRedirect,
}

impl ClientHandle {
    /// The wired API client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Subscribe to session events (e.g. expiry requiring a new login)
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Drop the event channel and keep only the client
    pub fn into_client(self) -> ApiClient {
        self.client
    }
}

/// Build a client from configuration
///
/// The credential store is restored from the configured backend, so a
/// session persisted by a previous run is used straight away.
///
/// # Errors
///
/// Returns `LessonLinkError::Config` for an invalid base URL or HTTP client
/// settings, and `LessonLinkError::Storage` when the backend cannot be
/// opened.
pub fn build_client(config: &Config) -> Result<ClientHandle> {
    let jar = Arc::new(Jar::default());

    let mut transport =
        ReqwestTransport::builder().timeout(config.api.timeout()).cookie_jar(Arc::clone(&jar));
    if let Some(agent) = &config.api.user_agent {
        transport = transport.user_agent(agent.clone());
    }
    let transport = transport.build()?;

    let csrf_source =
        JarCsrfSource::new(jar, &config.api.base_url, config.api.csrf_cookie_name.clone())?;
    let backend = open_backend(&config.storage)?;
    let store = Arc::new(CredentialStore::restore(backend, &config.storage.namespace));
    let events = BroadcastLoginRedirect::new(config.api.login_redirect_path.clone());

    let client = ApiClient::builder()
        .config(config.api.clone())
        .transport(Arc::new(transport))
        .store(store)
        .csrf_source(Arc::new(csrf_source))
        .login_redirect(Arc::new(events.clone()))
        .build()?;

    info!(
        base_url = %config.api.base_url,
        backend = %config.storage.backend,
        restored = client.is_authenticated(),
        "API client ready"
    );

    Ok(ClientHandle { client, events })
}

/// Load configuration (`.env`, environment, config files) and build a client
///
/// # Errors
///
/// See [`crate::config::load`] and [`build_client`].
pub fn build_client_from_env() -> Result<ClientHandle> {
    let config = crate::config::load()?;
    build_client(&config)
}

#[cfg(test)]
mod tests {
    use lessonlink_domain::{LessonLinkError, StorageBackend};

    use super::*;

    fn memory_config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.api.base_url = base_url.to_string();
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[test]
    fn test_build_with_memory_backend() {
        let handle = build_client(&memory_config("http://localhost:8000/api")).unwrap();
        assert!(!handle.client().is_authenticated());
        assert_eq!(handle.client().config().base_url, "http://localhost:8000/api");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = build_client(&memory_config("localhost without scheme"));
        assert!(matches!(result, Err(LessonLinkError::Config(_))));
    }
}
