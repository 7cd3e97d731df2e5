use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::RbenchError;
use crate::http::probe::{Probe, ProbeOutcome};

/// Wrapper around a reqwest Client bound to one target base URL, with
/// builder-pattern configuration and connection-pool settings.
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
    accept_invalid_certs: bool,
}

/// A response whose body has been read in full.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RbenchError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    base_url: String,
    timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    user_agent: String,
    bearer_token: Option<String>,
    danger_accept_invalid_certs: bool,
}

impl HttpClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("rbench/{}", env!("CARGO_PKG_VERSION")),
            bearer_token: None,
            danger_accept_invalid_certs: false,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Attach a pre-issued bearer token to every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> Result<HttpClient, RbenchError> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RbenchError::Validation(format!(
                "Target URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent)
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(HttpClient {
            inner: client,
            base_url,
            bearer_token: self.bearer_token,
            timeout: self.timeout,
            accept_invalid_certs: self.danger_accept_invalid_certs,
        })
    }
}

impl HttpClient {
    /// Returns a builder for a client targeting `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// GET `path` and read the whole body.
    pub async fn get(&self, path: &str) -> Result<HttpResponse, RbenchError> {
        self.execute(Method::GET, path).await
    }

    /// POST to `path` with an empty body and read the whole response.
    pub async fn post(&self, path: &str) -> Result<HttpResponse, RbenchError> {
        self.execute(Method::POST, path).await
    }

    async fn execute(&self, method: Method, path: &str) -> Result<HttpResponse, RbenchError> {
        let response = self.request(method, path).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.inner.request(method, self.url_for(path));
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Probe for HttpClient {
    /// GET `base_url + path`, draining the body so the timing covers the
    /// full response.
    async fn issue_request(&self, path: &str) -> ProbeOutcome {
        let start = Instant::now();
        let response = match self.request(Method::GET, path).send().await {
            Ok(r) => r,
            Err(e) => return ProbeOutcome::failed(e.to_string(), start.elapsed()),
        };
        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(_) => ProbeOutcome::completed(status, start.elapsed()),
            Err(e) => ProbeOutcome::failed(e.to_string(), start.elapsed()),
        }
    }
}
