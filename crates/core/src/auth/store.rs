//! Credential store with atomic session updates
//!
//! Holds the access token, refresh token, expiry hint and last-known user
//! profile. Every write updates memory and the backing [`KeyValueStore`]
//! under one write lock, so a reader never observes a half-written session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lessonlink_domain::constants::{
    KEY_ACCESS_TOKEN, KEY_EXPIRY_HINT, KEY_REFRESH_TOKEN, KEY_USER,
};
use lessonlink_domain::{Result, Session, TokenGrant, UserProfile};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::ports::KeyValueStore;

#[derive(Debug, Clone, Default)]
struct StoredCredentials {
    session: Session,
    user: Option<UserProfile>,
}

/// Namespaced keys so credentials never collide with unrelated preferences
#[derive(Debug, Clone)]
struct StorageKeys {
    access_token: String,
    refresh_token: String,
    expiry_hint: String,
    user: String,
}

impl StorageKeys {
    fn new(namespace: &str) -> Self {
        let namespace = namespace.trim_end_matches('.');
        Self {
            access_token: format!("{namespace}.{KEY_ACCESS_TOKEN}"),
            refresh_token: format!("{namespace}.{KEY_REFRESH_TOKEN}"),
            expiry_hint: format!("{namespace}.{KEY_EXPIRY_HINT}"),
            user: format!("{namespace}.{KEY_USER}"),
        }
    }
}

/// Process-wide credential store
///
/// Injected into the client as `Arc<CredentialStore>`; independent instances
/// never share state.
pub struct CredentialStore {
    state: RwLock<StoredCredentials>,
    backend: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl CredentialStore {
    /// Create an empty store without reading the backend
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            state: RwLock::new(StoredCredentials::default()),
            backend,
            keys: StorageKeys::new(namespace),
        }
    }

    /// Create a store that lives only in memory
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryKeyValueStore::default()),
            lessonlink_domain::constants::DEFAULT_STORAGE_NAMESPACE,
        )
    }

    /// Create a store seeded from what the backend persisted
    ///
    /// Read failures are logged and yield an empty session. A persisted
    /// refresh token without an access token is discarded.
    pub fn restore(backend: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        let store = Self::new(backend, namespace);
        match store.read_persisted() {
            Ok(credentials) => {
                if credentials.session.is_authenticated() {
                    info!("Credential store restored persisted session");
                }
                *store.state.write() = credentials;
            }
            Err(err) => warn!(error = %err, "Failed to restore persisted credentials"),
        }
        store
    }

    /// Snapshot of the current session
    pub fn get(&self) -> Session {
        self.state.read().session.clone()
    }

    /// Last-known user profile
    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().session.is_authenticated()
    }

    /// Replace the session, keeping the cached profile
    pub fn set(&self, session: Session) {
        let mut state = self.state.write();
        self.persist_session(&session);
        state.session = session;
    }

    /// Replace the cached profile
    pub fn set_user(&self, user: Option<UserProfile>) {
        let mut state = self.state.write();
        self.persist_user(user.as_ref());
        state.user = user;
    }

    /// Replace session and profile together (login)
    pub fn establish(&self, session: Session, user: Option<UserProfile>) {
        let mut state = self.state.write();
        self.persist_session(&session);
        self.persist_user(user.as_ref());
        *state = StoredCredentials { session, user };
        debug!("Credential store holds a new session");
    }

    /// Remove every credential; calling it on an empty store is a no-op
    pub fn clear(&self) {
        let mut state = self.state.write();
        self.clear_locked(&mut state);
    }

    /// Clear only if the stored refresh token still equals `expected`
    ///
    /// Returns whether the store was cleared. A failure observed for an old
    /// session must not wipe a session established after it.
    pub fn clear_if_refresh_token(&self, expected: Option<&str>) -> bool {
        let mut state = self.state.write();
        if state.session.refresh_token() != expected {
            debug!("Skipping credential clear; session changed since the failure");
            return false;
        }
        self.clear_locked(&mut state);
        true
    }

    /// Store the result of exchanging `exchanged_refresh_token`
    ///
    /// Applied only if the store still holds that refresh token; returns
    /// whether the grant was stored. This keeps a refresh that completes
    /// after logout from bringing the session back.
    pub fn apply_refresh(
        &self,
        exchanged_refresh_token: &str,
        grant: &TokenGrant,
        now: DateTime<Utc>,
    ) -> bool {
        let mut state = self.state.write();
        if state.session.refresh_token() != Some(exchanged_refresh_token) {
            return false;
        }
        let session = state.session.refreshed(
            grant.access_token.clone(),
            grant.refresh_token.clone(),
            grant.expiry_hint(now),
        );
        self.persist_session(&session);
        state.session = session;
        true
    }

    fn clear_locked(&self, state: &mut StoredCredentials) {
        for key in [
            &self.keys.access_token,
            &self.keys.refresh_token,
            &self.keys.expiry_hint,
            &self.keys.user,
        ] {
            if let Err(err) = self.backend.remove(key) {
                warn!(key = %key, error = %err, "Failed to remove persisted credential");
            }
        }
        *state = StoredCredentials::default();
    }

    fn persist_session(&self, session: &Session) {
        self.write_optional(&self.keys.access_token, session.access_token());
        self.write_optional(&self.keys.refresh_token, session.refresh_token());
        let expiry = session.expiry_hint().map(|at| at.to_rfc3339());
        self.write_optional(&self.keys.expiry_hint, expiry.as_deref());
    }

    fn persist_user(&self, user: Option<&UserProfile>) {
        let encoded = user.map(ToString::to_string);
        self.write_optional(&self.keys.user, encoded.as_deref());
    }

    fn write_optional(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.backend.set(key, value),
            None => self.backend.remove(key),
        };
        if let Err(err) = result {
            warn!(key = %key, error = %err, "Failed to persist credential");
        }
    }

    fn read_persisted(&self) -> Result<StoredCredentials> {
        let access_token = self.backend.get(&self.keys.access_token)?;
        let refresh_token = self.backend.get(&self.keys.refresh_token)?;
        let expiry_hint = self
            .backend
            .get(&self.keys.expiry_hint)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));
        let user = self
            .backend
            .get(&self.keys.user)?
            .and_then(|raw| serde_json::from_str::<UserProfile>(&raw).ok());

        let session = match access_token {
            Some(access) => Session::authenticated(access, refresh_token, expiry_hint),
            None => {
                if refresh_token.is_some() {
                    warn!("Discarding persisted refresh token without an access token");
                    self.backend.remove(&self.keys.refresh_token)?;
                }
                Session::empty()
            }
        };

        Ok(StoredCredentials { session, user })
    }
}

/// Key-value store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;

    fn backed_store() -> (Arc<InMemoryKeyValueStore>, CredentialStore) {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        let store = CredentialStore::new(backend.clone(), "lessonlink.auth");
        (backend, store)
    }

    fn grant(access: &str, refresh: Option<&str>) -> TokenGrant {
        TokenGrant {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_in: None,
            user: None,
        }
    }

    #[test]
    fn test_set_and_get_round_trip_through_backend() {
        let (backend, store) = backed_store();
        store.set(Session::authenticated("A1", Some("R1".into()), None));

        assert_eq!(store.get().access_token(), Some("A1"));
        assert_eq!(backend.get("lessonlink.auth.access_token").unwrap().as_deref(), Some("A1"));
        assert_eq!(backend.get("lessonlink.auth.refresh_token").unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_keys_are_namespaced() {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        backend.set("theme", "dark").unwrap();
        let store = CredentialStore::new(backend.clone(), "lessonlink.auth.");
        store.establish(Session::authenticated("A1", None, None), Some(json!({"id": 1})));
        store.clear();

        assert_eq!(backend.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (backend, store) = backed_store();
        store.establish(Session::authenticated("A1", Some("R1".into()), None), None);

        store.clear();
        assert_eq!(store.get(), Session::empty());
        store.clear();
        assert_eq!(store.get(), Session::empty());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_restore_reads_persisted_session_and_profile() {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        {
            let first = CredentialStore::new(backend.clone(), "lessonlink.auth");
            first.establish(
                Session::authenticated("A1", Some("R1".into()), None),
                Some(json!({"email": "a@b.com"})),
            );
        }

        let restored = CredentialStore::restore(backend, "lessonlink.auth");
        assert_eq!(restored.get().access_token(), Some("A1"));
        assert_eq!(restored.get().refresh_token(), Some("R1"));
        assert_eq!(restored.user(), Some(json!({"email": "a@b.com"})));
    }

    #[test]
    fn test_restore_discards_orphan_refresh_token() {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        backend.set("lessonlink.auth.refresh_token", "R1").unwrap();

        let restored = CredentialStore::restore(backend.clone(), "lessonlink.auth");
        assert_eq!(restored.get(), Session::empty());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_apply_refresh_requires_matching_refresh_token() {
        let (_backend, store) = backed_store();
        store.set(Session::authenticated("A1", Some("R1".into()), None));

        assert!(!store.apply_refresh("R0", &grant("A9", None), Utc::now()));
        assert_eq!(store.get().access_token(), Some("A1"));

        assert!(store.apply_refresh("R1", &grant("A2", Some("R2")), Utc::now()));
        assert_eq!(store.get().access_token(), Some("A2"));
        assert_eq!(store.get().refresh_token(), Some("R2"));
    }

    #[test]
    fn test_apply_refresh_after_logout_is_ignored() {
        let (_backend, store) = backed_store();
        store.set(Session::authenticated("A1", Some("R1".into()), None));
        store.clear();

        assert!(!store.apply_refresh("R1", &grant("A2", None), Utc::now()));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clear_if_refresh_token_protects_newer_session() {
        let (_backend, store) = backed_store();
        store.set(Session::authenticated("A9", Some("R9".into()), None));

        assert!(!store.clear_if_refresh_token(Some("R1")));
        assert!(store.is_authenticated());

        assert!(store.clear_if_refresh_token(Some("R9")));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_pairs() {
        let store = Arc::new(CredentialStore::in_memory());
        store.set(Session::authenticated("A0", Some("R0".into()), None));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 1..500 {
                    store.set(Session::authenticated(format!("A{i}"), Some(format!("R{i}")), None));
                }
            })
        };

        for _ in 0..500 {
            let session = store.get();
            let access = session.access_token().unwrap_or_default().trim_start_matches('A');
            let refresh = session.refresh_token().unwrap_or_default().trim_start_matches('R');
            assert_eq!(access, refresh);
        }

        writer.join().unwrap();
    }
}
