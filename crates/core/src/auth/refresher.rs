//! Single-flight session refresher
//!
//! At most one refresh exchange is in flight per refresher. Callers that
//! detect an expired access token while an exchange is running attach to the
//! same shared handle and observe the same [`RefreshOutcome`].
//!
//! The exchange itself runs on a spawned task, so it completes and updates
//! the credential store even if every caller waiting on it is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use lessonlink_domain::{
    LogicalRequest, Method, RequestOptions, ResponseData, Session, TokenGrant,
};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::ports::CsrfTokenSource;
use super::store::CredentialStore;
use crate::http::normalize::parse_body;
use crate::http::ports::Transport;
use crate::http::request_builder::RequestBuilder;

/// Result of one refresh cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The store now holds this access token
    Refreshed(String),
    /// The store had no refresh token; nothing was sent
    NoRefreshTokenAvailable,
    /// The backend refused the refresh token or could not be reached
    RefreshRejected,
}

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Why a refresh was requested
#[derive(Debug, Clone, Copy)]
enum Trigger<'a> {
    /// Caller asked for a refresh outright
    Explicit,
    /// A request carrying this access token (if any) got a 401
    Rejected(Option<&'a str>),
}

struct InFlight {
    generation: u64,
    outcome: SharedRefresh,
}

#[derive(Default)]
struct FlightState {
    in_flight: Option<InFlight>,
    /// Refresh token the backend last refused; never exchanged again
    rejected: Option<String>,
}

struct RefresherInner {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    builder: RequestBuilder,
    csrf_source: Option<Arc<dyn CsrfTokenSource>>,
    refresh_path: String,
    flight: Mutex<FlightState>,
    generation: AtomicU64,
    refreshes: AtomicU64,
}

/// Exchanges the stored refresh token for a new access token
///
/// Cheap to clone; clones share the in-flight handle.
#[derive(Clone)]
pub struct SessionRefresher {
    inner: Arc<RefresherInner>,
}

impl SessionRefresher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        builder: RequestBuilder,
        csrf_source: Option<Arc<dyn CsrfTokenSource>>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                transport,
                store,
                builder,
                csrf_source,
                refresh_path: refresh_path.into(),
                flight: Mutex::new(FlightState::default()),
                generation: AtomicU64::new(0),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Refresh the stored session, joining an exchange already in flight
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        self.coordinate(Trigger::Explicit).await
    }

    /// Obtain a usable access token after a request carrying
    /// `failed_access_token` was refused
    ///
    /// Returns the store's current token without a network call when it
    /// differs from the one the request carried (another request refreshed
    /// first, or a login completed while a request without a token was in
    /// flight).
    pub async fn ensure_fresh(&self, failed_access_token: Option<&str>) -> RefreshOutcome {
        self.coordinate(Trigger::Rejected(failed_access_token)).await
    }

    async fn coordinate(&self, trigger: Trigger<'_>) -> RefreshOutcome {
        let pending = {
            let mut flight = self.inner.flight.lock();
            if let Some(in_flight) = &flight.in_flight {
                debug!(generation = in_flight.generation, "Joining in-flight session refresh");
                in_flight.outcome.clone()
            } else {
                let session = self.inner.store.get();
                if let (Trigger::Rejected(failed), Some(current)) =
                    (trigger, session.access_token())
                {
                    if failed != Some(current) {
                        debug!("Access token already replaced; skipping refresh");
                        return RefreshOutcome::Refreshed(current.to_string());
                    }
                }
                let Some(refresh_token) = session.refresh_token() else {
                    debug!("No refresh token stored");
                    return RefreshOutcome::NoRefreshTokenAvailable;
                };
                if flight.rejected.as_deref() == Some(refresh_token) {
                    debug!("Refresh token was already rejected");
                    return RefreshOutcome::RefreshRejected;
                }
                self.start_locked(&mut flight, refresh_token.to_string())
            }
        };
        pending.await
    }

    /// Exchange `refresh_token`, or join the exchange already in flight
    pub async fn refresh(&self, refresh_token: String) -> RefreshOutcome {
        let pending = {
            let mut flight = self.inner.flight.lock();
            match &flight.in_flight {
                Some(in_flight) => in_flight.outcome.clone(),
                None if flight.rejected.as_deref() == Some(refresh_token.as_str()) => {
                    return RefreshOutcome::RefreshRejected;
                }
                None => self.start_locked(&mut flight, refresh_token),
            }
        };
        pending.await
    }

    /// Whether an exchange is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.flight.lock().in_flight.is_some()
    }

    /// Number of refresh exchanges sent to the backend
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::SeqCst)
    }

    fn start_locked(&self, flight: &mut FlightState, refresh_token: String) -> SharedRefresh {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Starting session refresh");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = inner.exchange(&refresh_token).await;
            let rejected = (outcome == RefreshOutcome::RefreshRejected).then_some(refresh_token);
            inner.release(generation, rejected);
            outcome
        });

        let inner = Arc::clone(&self.inner);
        let outcome = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, "Session refresh task did not complete");
                    inner.release(generation, None);
                    RefreshOutcome::RefreshRejected
                }
            }
        }
        .boxed()
        .shared();

        flight.in_flight = Some(InFlight { generation, outcome: outcome.clone() });
        outcome
    }
}

impl RefresherInner {
    async fn exchange(&self, refresh_token: &str) -> RefreshOutcome {
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        let request = LogicalRequest::new(Method::Post, self.refresh_path.as_str())
            .with_body(json!({ "refresh": refresh_token }))
            .with_options(RequestOptions::skip_auth());
        let csrf = self.csrf_source.as_ref().and_then(|source| source.csrf_token());
        let wire = self.builder.build(&request, &Session::empty(), csrf.as_deref());

        let response = match self.transport.send(wire).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Session refresh could not reach the backend");
                return RefreshOutcome::RefreshRejected;
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "Session refresh rejected");
            return RefreshOutcome::RefreshRejected;
        }

        let grant = match parse_body(&response) {
            Ok(ResponseData::Json(body)) => TokenGrant::from_json(&body),
            _ => None,
        };
        let Some(grant) = grant else {
            warn!(status = response.status, "Refresh response carried no access token");
            return RefreshOutcome::RefreshRejected;
        };

        if self.store.apply_refresh(refresh_token, &grant, Utc::now()) {
            info!(rotated = grant.refresh_token.is_some(), "Session refreshed");
            return RefreshOutcome::Refreshed(grant.access_token);
        }

        // The session changed while the exchange was running
        match self.store.get().access_token() {
            Some(current) => {
                debug!("Session replaced during refresh; keeping the newer one");
                RefreshOutcome::Refreshed(current.to_string())
            }
            None => {
                debug!("Session cleared during refresh; discarding result");
                RefreshOutcome::RefreshRejected
            }
        }
    }

    fn release(&self, generation: u64, rejected: Option<String>) {
        let mut flight = self.flight.lock();
        if flight.in_flight.as_ref().is_some_and(|in_flight| in_flight.generation == generation) {
            flight.in_flight = None;
            if rejected.is_some() {
                flight.rejected = rejected;
            }
        }
    }
}

impl fmt::Debug for SessionRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRefresher")
            .field("refresh_path", &self.inner.refresh_path)
            .field("refreshing", &self.is_refreshing())
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}
