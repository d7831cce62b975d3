//! Authenticated API client
//!
//! Issues requests with the stored bearer token, refreshes the session once
//! when the backend reports it expired, and retries the original request a
//! single time. Every outcome is returned as a [`NormalizedResponse`];
//! nothing here panics or returns a transport error to the caller.

use std::sync::Arc;

use chrono::Utc;
use lessonlink_domain::constants::{
    MSG_MALFORMED_RESPONSE, MSG_NETWORK_FAILURE, MSG_SESSION_EXPIRED,
};
use lessonlink_domain::{
    ApiConfig, ApiError, LessonLinkError, LoginCredentials, LogicalRequest, Method,
    NormalizedResponse, RequestBody, RequestOptions, ResponseData, Session, TokenGrant,
    UserProfile,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::state::{Attempt, RequestState};
use crate::auth::ports::{CsrfTokenSource, LoggingLoginRedirect, LoginRedirect};
use crate::auth::refresher::{RefreshOutcome, SessionRefresher};
use crate::auth::store::CredentialStore;
use crate::http::ports::{Transport, TransportError};
use crate::http::request_builder::RequestBuilder;

/// API client with transparent session refresh
///
/// Cheap to clone; clones share the transport, the credential store and the
/// single-flight refresher.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    builder: RequestBuilder,
    refresher: SessionRefresher,
    csrf_source: Option<Arc<dyn CsrfTokenSource>>,
    login_redirect: Arc<dyn LoginRedirect>,
}

impl ApiClient {
    /// Create a builder for API client
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Run one logical request through the state machine
    #[instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path, request_id = %Uuid::new_v4())
    )]
    pub async fn send(&self, request: LogicalRequest) -> NormalizedResponse {
        let mut state = RequestState::start();
        loop {
            state = match state {
                RequestState::Building(attempt) => {
                    let session = self.store.get();
                    let csrf = self.csrf_token();
                    let wire = self.builder.build(&request, &session, csrf.as_deref());
                    debug!(retry = attempt.is_retry(), "Sending request");
                    let outcome = self.transport.send(wire).await;
                    RequestState::Sent { attempt, session, outcome }
                }
                RequestState::Sent { attempt, session, outcome } => match outcome {
                    Ok(response) => {
                        RequestState::after_send(attempt, session, response, request.skip_auth)
                    }
                    Err(err) => RequestState::Finished(network_failure(&err)),
                },
                RequestState::AuthExpired { ticket: _, session } => {
                    info!("Access token rejected; refreshing session");
                    match self.refresher.ensure_fresh(session.access_token()).await {
                        RefreshOutcome::Refreshed(_) => RequestState::Retrying,
                        outcome => {
                            self.end_session(&session, &outcome);
                            RequestState::Finished(session_expired())
                        }
                    }
                }
                RequestState::Retrying => RequestState::Building(Attempt::Retry),
                RequestState::Finished(response) => {
                    debug!(status = response.status, success = response.success, "Request finished");
                    return response;
                }
            };
        }
    }

    /// `GET path`
    pub async fn get(&self, path: &str, options: RequestOptions) -> NormalizedResponse {
        self.send(LogicalRequest::new(Method::Get, path).with_options(options)).await
    }

    /// `POST path` with `body`
    pub async fn post(
        &self,
        path: &str,
        body: impl Into<RequestBody> + Send,
        options: RequestOptions,
    ) -> NormalizedResponse {
        self.send(LogicalRequest::new(Method::Post, path).with_body(body).with_options(options))
            .await
    }

    /// `PUT path` with `body`
    pub async fn put(
        &self,
        path: &str,
        body: impl Into<RequestBody> + Send,
        options: RequestOptions,
    ) -> NormalizedResponse {
        self.send(LogicalRequest::new(Method::Put, path).with_body(body).with_options(options))
            .await
    }

    /// `PATCH path` with `body`
    pub async fn patch(
        &self,
        path: &str,
        body: impl Into<RequestBody> + Send,
        options: RequestOptions,
    ) -> NormalizedResponse {
        self.send(LogicalRequest::new(Method::Patch, path).with_body(body).with_options(options))
            .await
    }

    /// `DELETE path`
    pub async fn delete(&self, path: &str, options: RequestOptions) -> NormalizedResponse {
        self.send(LogicalRequest::new(Method::Delete, path).with_options(options)).await
    }

    /// Exchange credentials for a session
    ///
    /// On success the tokens and the returned user profile are stored. A
    /// success body without an access token is reported as malformed.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &LoginCredentials) -> NormalizedResponse {
        let request = LogicalRequest::new(Method::Post, self.config.token_path.as_str())
            .with_body(json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .with_options(RequestOptions::skip_auth());

        let response = self.send(request).await;
        if !response.success {
            warn!(status = response.status, "Login failed");
            return response;
        }

        if self.establish_from(&response) {
            info!("Logged in");
            response
        } else {
            warn!(status = response.status, "Token response carried no access token");
            missing_token(response)
        }
    }

    /// Create an account
    ///
    /// Backends that log the new user in straight away return tokens; those
    /// are stored like a login.
    #[instrument(skip_all)]
    pub async fn register(&self, payload: Value) -> NormalizedResponse {
        let request = LogicalRequest::new(Method::Post, self.config.register_path.as_str())
            .with_body(payload)
            .with_options(RequestOptions::skip_auth());

        let response = self.send(request).await;
        if response.success && self.establish_from(&response) {
            info!("Registered and logged in");
        }
        response
    }

    /// Forget the session
    ///
    /// Clears the store first, then notifies the configured logout endpoint
    /// on a best-effort basis. Calling it while logged out is a no-op.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let session = self.store.get();
        self.store.clear();

        if let (Some(path), Some(refresh_token)) =
            (self.config.logout_path.as_deref(), session.refresh_token())
        {
            let request = LogicalRequest::new(Method::Post, path)
                .with_body(json!({ "refresh": refresh_token }))
                .with_options(RequestOptions::skip_auth());
            let csrf = self.csrf_token();
            let wire = self.builder.build(&request, &session, csrf.as_deref());
            match self.transport.send(wire).await {
                Ok(response) if response.is_success() => debug!("Server-side logout accepted"),
                Ok(response) => debug!(status = response.status, "Server-side logout refused"),
                Err(err) => debug!(error = %err, "Server-side logout unreachable"),
            }
        }

        if session.is_authenticated() {
            info!("Logged out");
        }
    }

    /// Refresh the session on demand
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionExpired`] when no refresh token is stored or
    /// the backend rejects it; the store is then cleared and the login
    /// redirect is triggered, exactly as for a request.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let session = self.store.get();
        match self.refresher.refresh_session().await {
            RefreshOutcome::Refreshed(_) => Ok(()),
            outcome => {
                self.end_session(&session, &outcome);
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Load the profile of the logged-in user and cache it in the store
    pub async fn fetch_current_user(&self) -> NormalizedResponse {
        let response = self.get(&self.config.profile_path, RequestOptions::default()).await;
        if response.success {
            if let Some(user) = response.data.as_json().filter(|user| user.is_object()) {
                self.store.set_user(Some(user.clone()));
            }
        }
        response
    }

    /// Snapshot of the stored session
    pub fn session(&self) -> Session {
        self.store.get()
    }

    /// Last-known user profile
    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    /// Whether the store holds an access token
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Shared credential store
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Single-flight refresher shared by every clone
    pub fn refresher(&self) -> &SessionRefresher {
        &self.refresher
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn csrf_token(&self) -> Option<String> {
        self.csrf_source.as_ref().and_then(|source| source.csrf_token())
    }

    fn establish_from(&self, response: &NormalizedResponse) -> bool {
        let Some(grant) = response.data.as_json().and_then(TokenGrant::from_json) else {
            return false;
        };
        let expiry_hint = grant.expiry_hint(Utc::now());
        let session = Session::authenticated(grant.access_token, grant.refresh_token, expiry_hint);
        self.store.establish(session, grant.user);
        true
    }

    /// Terminal session failure: clear and send the user to the login screen
    ///
    /// Only the session the request was built with is cleared; a session
    /// established after it survives.
    fn end_session(&self, session: &Session, outcome: &RefreshOutcome) {
        let reason = match outcome {
            RefreshOutcome::NoRefreshTokenAvailable => "no_refresh_token",
            RefreshOutcome::RefreshRejected | RefreshOutcome::Refreshed(_) => "refresh_rejected",
        };
        let cleared = self.store.clear_if_refresh_token(session.refresh_token());
        warn!(reason, cleared, "Session expired");
        self.login_redirect.redirect_to_login();
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.builder.base_url())
            .field("refresher", &self.refresher)
            .finish_non_exhaustive()
    }
}

fn network_failure(err: &TransportError) -> NormalizedResponse {
    warn!(error = %err, "Request could not reach the backend");
    NormalizedResponse::failure(ApiError::from(err.clone()), ResponseData::Empty, MSG_NETWORK_FAILURE)
}

fn session_expired() -> NormalizedResponse {
    NormalizedResponse::failure(ApiError::SessionExpired, ResponseData::Empty, MSG_SESSION_EXPIRED)
}

fn missing_token(response: NormalizedResponse) -> NormalizedResponse {
    let raw = response.data.clone().into_json().to_string();
    NormalizedResponse::failure(
        ApiError::MalformedResponse {
            status: response.status,
            reason: "token response carried no access token".to_string(),
            raw,
        },
        response.data,
        MSG_MALFORMED_RESPONSE,
    )
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<CredentialStore>>,
    csrf_source: Option<Arc<dyn CsrfTokenSource>>,
    login_redirect: Option<Arc<dyn LoginRedirect>>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn csrf_source(mut self, csrf_source: Arc<dyn CsrfTokenSource>) -> Self {
        self.csrf_source = Some(csrf_source);
        self
    }

    /// Set the collaborator notified when a session ends for good
    ///
    /// Defaults to [`LoggingLoginRedirect`].
    #[must_use]
    pub fn login_redirect(mut self, login_redirect: Arc<dyn LoginRedirect>) -> Self {
        self.login_redirect = Some(login_redirect);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns [`LessonLinkError::Config`] if the transport or the store is
    /// missing, or the base URL is empty.
    pub fn build(self) -> Result<ApiClient, LessonLinkError> {
        let config = self.config.unwrap_or_default();
        if config.base_url.trim().is_empty() {
            return Err(LessonLinkError::Config("API base URL is empty".to_string()));
        }
        let transport = self
            .transport
            .ok_or_else(|| LessonLinkError::Config("Transport not set".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| LessonLinkError::Config("Credential store not set".to_string()))?;
        let login_redirect = self.login_redirect.unwrap_or_else(|| Arc::new(LoggingLoginRedirect));

        let builder = RequestBuilder::new(config.base_url.as_str(), config.csrf_header_name.as_str());
        let refresher = SessionRefresher::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            builder.clone(),
            self.csrf_source.clone(),
            config.refresh_path.as_str(),
        );

        Ok(ApiClient {
            config,
            transport,
            store,
            builder,
            refresher,
            csrf_source: self.csrf_source,
            login_redirect,
        })
    }
}
