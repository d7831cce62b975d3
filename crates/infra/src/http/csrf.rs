//! Anti-forgery token read from the transport's cookie jar

use std::sync::Arc;

use lessonlink_core::CsrfTokenSource;
use lessonlink_domain::LessonLinkError;
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

/// Reads the CSRF cookie the backend set on earlier responses
///
/// Shares its [`Jar`] with [`super::ReqwestTransport`], so the token is
/// whatever the last response set.
#[derive(Debug, Clone)]
pub struct JarCsrfSource {
    jar: Arc<Jar>,
    url: Url,
    cookie_name: String,
}

impl JarCsrfSource {
    /// # Errors
    ///
    /// Returns [`LessonLinkError::Config`] when `base_url` is not a valid URL.
    pub fn new(
        jar: Arc<Jar>,
        base_url: &str,
        cookie_name: impl Into<String>,
    ) -> Result<Self, LessonLinkError> {
        let url = Url::parse(base_url)
            .map_err(|err| LessonLinkError::Config(format!("Invalid API base URL: {err}")))?;
        Ok(Self { jar, url, cookie_name: cookie_name.into() })
    }
}

impl CsrfTokenSource for JarCsrfSource {
    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let cookies = header.to_str().ok()?;
        cookie_value(cookies, &self.cookie_name)
    }
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`)
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
