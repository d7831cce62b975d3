//! Port interfaces for credential persistence and session side effects
//!
//! These traits define the boundaries between the client and the
//! environment it runs in (disk, keychain, cookie jar, UI navigation).

use lessonlink_domain::Result;
use tracing::info;

/// Namespaced string key-value persistence
///
/// Calls are synchronous and must not block for long; implementations back
/// the credential store, which holds its lock while writing.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Source of the anti-forgery token (a non-HTTP-only cookie)
pub trait CsrfTokenSource: Send + Sync {
    /// Current token, if the cookie is set
    fn csrf_token(&self) -> Option<String>;
}

/// Collaborator that sends the user back to the login screen
pub trait LoginRedirect: Send + Sync {
    /// Called once per request that ends with an expired session
    fn redirect_to_login(&self);
}

/// Redirect that only records the event in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingLoginRedirect;

impl LoginRedirect for LoggingLoginRedirect {
    fn redirect_to_login(&self) {
        info!("Session expired; login required");
    }
}
