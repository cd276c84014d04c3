//! Shared HTTP client configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forge_session::TokenStore;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};
use crate::machine::{CallPolicy, Exchange, RefreshedTokens};
use crate::request::{ApiRequest, ApiResponse};
use crate::retry::RetryPolicy;
use crate::session::SessionClient;

/// Default base URL of the backend API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1/";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for health probes.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Paths of the backend's authentication endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub health: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "auth/login/".to_string(),
            refresh: "auth/refresh/".to_string(),
            logout: "auth/logout/".to_string(),
            health: "health/".to_string(),
        }
    }
}

/// Forge backend API client.
///
/// Holds the connection pool and settings shared by every request. Bind it to
/// one session's [`TokenStore`] with [`ForgeClient::session`] to make
/// authenticated calls.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use forge_client::ForgeClient;
/// use forge_session::{MemorySession, TokenStore};
///
/// # async fn example() -> forge_client::Result<()> {
/// let client = ForgeClient::builder()
///     .base_url("http://localhost:8000/api/v1/")
///     .build()?;
///
/// let session = client.session(TokenStore::new(Arc::new(MemorySession::new())));
/// session.login("tech", "secret").await?;
/// let clients = session.call(forge_client::Method::GET, "clients/", None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ForgeClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    endpoints: AuthEndpoints,
    policy: CallPolicy,
}

impl ForgeClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client with default settings pointing to the local backend.
    pub fn localhost() -> Result<Self> {
        Self::builder().base_url(DEFAULT_BASE_URL).build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.inner.endpoints
    }

    /// Refresh and retry settings applied to authenticated calls.
    pub fn policy(&self) -> &CallPolicy {
        &self.inner.policy
    }

    /// Bind this client to one session's credentials.
    pub fn session(&self, store: TokenStore) -> SessionClient {
        SessionClient::new(self.clone(), store)
    }

    /// Check whether the backend's health endpoint answers 200.
    pub async fn is_api_available(&self) -> bool {
        match self.probe(&self.inner.endpoints.health).await {
            Ok(200) => {
                tracing::debug!("API health check passed");
                true
            }
            Ok(status) => {
                tracing::warn!(status, "API health check failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "API health check failed");
                false
            }
        }
    }

    /// Probe several endpoints and report whether any answers like a live backend.
    ///
    /// 200, 401 and 405 all count: the latter two prove the API is routing
    /// requests even though the probe itself is not allowed.
    pub async fn health_check(&self) -> bool {
        let endpoints = [
            self.inner.endpoints.health.as_str(),
            "",
            self.inner.endpoints.login.as_str(),
        ];

        for endpoint in endpoints {
            match self.probe(endpoint).await {
                Ok(status @ (200 | 401 | 405)) => {
                    tracing::debug!(endpoint, status, "Health check passed");
                    return true;
                }
                Ok(status) => tracing::debug!(endpoint, status, "Health probe rejected"),
                Err(e) => tracing::debug!(endpoint, error = %e, "Health probe failed"),
            }
        }

        tracing::warn!("All health check endpoints failed");
        false
    }

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    async fn probe(&self, path: &str) -> Result<u16> {
        let url = self.url(path)?;
        let response = self
            .inner
            .http
            .get(url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    /// Send `request`, attaching `bearer` if given. Any HTTP status is `Ok`.
    pub(crate) async fn send_request(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse> {
        let url = self.url(&request.path)?;
        tracing::debug!(method = %request.method, url = %url, "API request");

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .timeout(self.inner.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::debug!(status, bytes = text.len(), "API response received");
        Ok(ApiResponse::new(status, text))
    }
}

#[async_trait]
impl Exchange for ForgeClient {
    async fn send(&self, request: &ApiRequest, access_token: &str) -> Result<ApiResponse> {
        self.send_request(request, Some(access_token)).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens> {
        let request = ApiRequest::post(
            self.inner.endpoints.refresh.clone(),
            json!({ "refresh": refresh_token }),
        );
        let response = self.send_request(&request, None).await?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "Token refresh rejected");
            return Err(response.into_error());
        }

        let status = response.status;
        let body = response.json()?;
        serde_json::from_value(body).map_err(|e| Error::InvalidResponse {
            status,
            message: format!("refresh response missing tokens: {}", e),
        })
    }
}

/// Builder for creating a [`ForgeClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    staleness_threshold: Duration,
    expiry_buffer: Duration,
    endpoints: AuthEndpoints,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        let policy = CallPolicy::default();
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retry: policy.retry,
            staleness_threshold: policy.staleness_threshold,
            expiry_buffer: policy.expiry_buffer,
            endpoints: AuthEndpoints::default(),
            user_agent: None,
        }
    }

    /// Set the base URL of the backend API (including any `/api/v1/` prefix).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the transport retry budget.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }

    /// Set the delay before the first transport retry.
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry.initial_backoff = backoff;
        self
    }

    /// Set the token age at which a proactive refresh happens.
    pub fn staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    /// Set the margin before a JWT's `exp` at which a proactive refresh happens.
    pub fn expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Override the authentication endpoint paths.
    pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ForgeClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("forge-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(ForgeClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                endpoints: self.endpoints,
                policy: CallPolicy {
                    staleness_threshold: self.staleness_threshold,
                    expiry_buffer: self.expiry_buffer,
                    retry: self.retry,
                },
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
