use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lessonlink_core::{Transport, TransportError};
use lessonlink_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use lessonlink_domain::{FormPart, FormValue, LessonLinkError, Method, RawResponse, RequestBody, WireRequest};
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::errors::{transport_error, InfraError};

/// HTTP transport backed by reqwest.
///
/// Sends each request exactly once; the only retry in the client is the
/// orchestrator's single retry after a session refresh.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, LessonLinkError> {
        Self::builder().build()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        let method = reqwest_method(request.method);
        let mut builder = self.client.request(method.clone(), request.url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Binary { data, content_type }) => match content_type {
                Some(content_type) => builder.header(CONTENT_TYPE, content_type).body(data),
                None => builder.body(data),
            },
            Some(RequestBody::Multipart(parts)) => builder.multipart(multipart_form(parts)?),
        };

        debug!(%method, url = %request.url, "sending HTTP request");

        let response =
            builder.send().await.map_err(|err| transport_error(&err, self.timeout))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body =
            response.bytes().await.map_err(|err| transport_error(&err, self.timeout))?.to_vec();

        debug!(%method, url = %request.url, status, "received HTTP response");

        Ok(RawResponse { status, content_type, body })
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    cookie_jar: Option<Arc<Jar>>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            cookie_jar: None,
        }
    }
}

impl ReqwestTransportBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Share a cookie jar with other collaborators (e.g. the CSRF source).
    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, LessonLinkError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(jar) = self.cookie_jar {
            builder = builder.cookie_provider(jar);
        }

        let client = builder.build().map_err(|err| LessonLinkError::from(InfraError::from(err)))?;

        Ok(ReqwestTransport { client, timeout: self.timeout })
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn multipart_form(parts: Vec<FormPart>) -> Result<Form, TransportError> {
    parts.into_iter().try_fold(Form::new(), |form, part| match part.value {
        FormValue::Text(text) => Ok(form.text(part.name, text)),
        FormValue::File { file_name, data, content_type } => {
            let mut file = Part::bytes(data).file_name(file_name);
            if let Some(content_type) = content_type {
                file = file.mime_str(&content_type).map_err(|err| {
                    TransportError::Network(format!("invalid multipart content type: {err}"))
                })?;
            }
            Ok(form.part(part.name, file))
        }
    })
}
