//! Test doubles for the client's ports
//!
//! Available to this crate's unit tests and, behind the `test-utils`
//! feature, to downstream crates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lessonlink_domain::{RawResponse, WireRequest};
use parking_lot::Mutex;

use crate::auth::ports::{CsrfTokenSource, LoginRedirect};
use crate::http::ports::{Transport, TransportError};

type Handler = dyn Fn(&WireRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// Transport answering from a scripted closure
///
/// Every request is recorded before the optional delay, so counts are
/// visible while calls are still pending.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<WireRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&WireRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()), delay: None }
    }

    /// Hold every response for `delay` before returning it
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All requests seen so far, in arrival order
    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests whose URL ends with `path`
    pub fn calls_to(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|request| request.url.ends_with(path)).count()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.call_count())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

/// Login redirect that counts invocations
#[derive(Debug, Default, Clone)]
pub struct RecordingLoginRedirect {
    redirects: Arc<AtomicUsize>,
}

impl RecordingLoginRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for RecordingLoginRedirect {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// CSRF source returning a fixed token
#[derive(Debug, Clone)]
pub struct StaticCsrfToken(pub String);

impl CsrfTokenSource for StaticCsrfToken {
    fn csrf_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
