//! Authenticated client bound to one session.

use forge_session::{TokenStore, UserProfile};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::ForgeClient;
use crate::error::{Error, Result};
use crate::machine::AuthenticatedCall;
use crate::request::{ApiRequest, extract_error_message};
use crate::retry::with_retry;

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub success: bool,
    /// Greeting on success, backend's reason on failure.
    pub message: String,
    pub profile: Option<UserProfile>,
}

impl LoginOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            profile: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginTokens {
    access: String,
    refresh: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Authenticated HTTP client for one session.
///
/// Create one per incoming request with [`ForgeClient::session`]; it holds no
/// state beyond the shared client and the session's [`TokenStore`].
#[derive(Debug, Clone)]
pub struct SessionClient {
    client: ForgeClient,
    store: TokenStore,
}

impl SessionClient {
    pub(crate) fn new(client: ForgeClient, store: TokenStore) -> Self {
        Self { client, store }
    }

    /// The session's token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The shared client this session uses.
    pub fn client(&self) -> &ForgeClient {
        &self.client
    }

    /// Whether the session holds a complete credential record. No network.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.store.get_credentials()?.is_some())
    }

    /// Cached profile of the logged-in user.
    pub fn user_profile(&self) -> Result<Option<UserProfile>> {
        Ok(self.store.user_profile()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Log in against the backend and populate the session on success.
    ///
    /// Rejected credentials are an unsuccessful [`LoginOutcome`], not an error.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let request = ApiRequest::post(
            self.client.endpoints().login.clone(),
            json!({ "username": username, "password": password }),
        );

        let client = &self.client;
        let response = with_retry(&client.policy().retry, "login", || {
            client.send_request(&request, None)
        })
        .await?;

        tracing::info!(username, status = response.status, "Login response");

        if response.is_auth_rejection() {
            return Ok(LoginOutcome::rejected("Invalid credentials"));
        }
        if (400..500).contains(&response.status) {
            let message = extract_error_message(&response.json().unwrap_or(Value::Null));
            let message = if message.is_empty() {
                "Login rejected".to_string()
            } else {
                message
            };
            return Ok(LoginOutcome::rejected(message));
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        let status = response.status;
        let tokens: LoginTokens =
            serde_json::from_value(response.json()?).map_err(|e| Error::InvalidResponse {
                status,
                message: format!("login response missing tokens: {}", e),
            })?;

        let mut profile = tokens.user.unwrap_or_default();
        if profile.username.is_empty() {
            profile.username = username.to_string();
        }

        self.store
            .set_credentials(tokens.access, tokens.refresh, profile.clone())
            .map_err(|e| match e {
                forge_session::Error::InvalidCredentials(message) => {
                    Error::InvalidResponse { status, message }
                }
                other => Error::Session(other),
            })?;

        tracing::info!(username, "User logged in");
        Ok(LoginOutcome {
            success: true,
            message: format!("Welcome, {}!", profile.display_name()),
            profile: Some(profile),
        })
    }

    /// Log out: tell the backend to revoke the refresh token, then clear the
    /// session. Backend failures are logged and ignored.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh_token) = self.store.refresh_token()? {
            let access = self.store.get_credentials()?.map(|c| c.access_token);
            let request = ApiRequest::post(
                self.client.endpoints().logout.clone(),
                json!({ "refresh": refresh_token }),
            );

            match self.client.send_request(&request, access.as_deref()).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!("Backend revoked refresh token");
                }
                Ok(response) => {
                    tracing::debug!(status = response.status, "Backend logout rejected, ignoring");
                }
                Err(e) => tracing::debug!(error = %e, "Backend logout failed, ignoring"),
            }
        }

        self.store.clear_credentials()?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// Return an access token fit for use, refreshing it first if needed.
    pub async fn access_token(&self) -> Result<String> {
        AuthenticatedCall::token_only(&self.client, &self.store, self.client.policy())
            .acquire_token()
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authenticated calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Perform an authenticated call and return the parsed JSON body.
    ///
    /// An empty response body is returned as `null`.
    pub async fn call(&self, method: Method, path: &str, payload: Option<Value>) -> Result<Value> {
        let mut request = ApiRequest::new(method, path);
        request.body = payload;
        self.execute(request).await
    }

    /// Perform an authenticated call described by `request`.
    pub async fn execute(&self, request: ApiRequest) -> Result<Value> {
        AuthenticatedCall::new(&self.client, &self.store, self.client.policy(), request)
            .run()
            .await
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.typed(ApiRequest::get(path)).await
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (k, v)| req.with_query(*k, v));
        self.typed(request).await
    }

    /// Make a POST request.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.typed(ApiRequest::post(path, serde_json::to_value(body)?)).await
    }

    /// Make a PUT request.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.typed(ApiRequest::put(path, serde_json::to_value(body)?)).await
    }

    /// Make a PATCH request.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.typed(ApiRequest::patch(path, serde_json::to_value(body)?)).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Fetch one page of a list endpoint.
    pub async fn get_paginated(
        &self,
        path: &str,
        page: u32,
        page_size: u32,
        filters: &[(&str, &str)],
    ) -> Result<Value> {
        let request = filters.iter().fold(
            ApiRequest::get(path)
                .with_query("page", page)
                .with_query("page_size", page_size),
            |req, (k, v)| req.with_query(*k, v),
        );
        self.execute(request).await
    }

    /// Run a `search` query against a list endpoint.
    pub async fn search(&self, path: &str, query: &str, limit: u32) -> Result<Value> {
        self.execute(
            ApiRequest::get(path)
                .with_query("search", query)
                .with_query("limit", limit),
        )
        .await
    }

    async fn typed<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_value(body)?)
    }
}
