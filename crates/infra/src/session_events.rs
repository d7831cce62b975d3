//! Session events for UI code
//!
//! The client reports a terminal session failure through the
//! [`LoginRedirect`] port. [`BroadcastLoginRedirect`] turns that into a
//! [`SessionEvent`] on a broadcast channel that any number of UI listeners
//! can subscribe to.

use lessonlink_core::LoginRedirect;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Events broadcast when the session state changes for good
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session could not be refreshed; navigate to `login_path`
    Expired { login_path: String },
}

/// Login redirect that broadcasts [`SessionEvent::Expired`]
#[derive(Debug, Clone)]
pub struct BroadcastLoginRedirect {
    login_path: String,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl BroadcastLoginRedirect {
    pub fn new(login_path: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { login_path: login_path.into(), event_tx }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}

impl LoginRedirect for BroadcastLoginRedirect {
    fn redirect_to_login(&self) {
        let event = SessionEvent::Expired { login_path: self.login_path.clone() };
        match self.event_tx.send(event) {
            Ok(listeners) => info!(listeners, login_path = %self.login_path, "Session expired"),
            Err(_) => debug!("Session expired with no listeners subscribed"),
        }
    }
}
