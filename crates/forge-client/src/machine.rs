//! Per-call authentication state machine.
//!
//! Every authenticated call walks the same states:
//!
//! ```text
//! NeedToken ──► TokenReady ──► Calling ──► Success
//!     │             ▲             │
//!     ▼             │             ▼
//! Refreshing ───────┘         AuthFailed ──► Refreshing ──► CallingRetry ──► Success
//!     │                                          │                 │
//!     ▼                                          ▼                 ▼
//!   Fatal                                      Fatal             Fatal
//! ```
//!
//! The machine only talks to the network through [`Exchange`], so it can be
//! driven by a scripted fake as easily as by the real HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use forge_session::TokenStore;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::request::{ApiRequest, ApiResponse};
use crate::retry::{RetryPolicy, with_retry};

/// Default age after which an access token is refreshed before use.
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(55 * 60);

/// Default margin before a JWT's `exp` at which it is refreshed before use.
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Network operations the state machine needs.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Send `request` with `access_token` as bearer.
    ///
    /// Any HTTP status is `Ok`; only transport failures are errors.
    async fn send(&self, request: &ApiRequest, access_token: &str) -> Result<ApiResponse>;

    /// Trade `refresh_token` for a new access token.
    ///
    /// Returns [`Error::Transport`] for network failures and any other error
    /// when the backend refused or answered with something unusable.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens>;
}

/// Tokens returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedTokens {
    pub access: String,
    /// Present only when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Tunables shared by every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPolicy {
    /// Refresh proactively once the access token is this old.
    pub staleness_threshold: Duration,
    /// Refresh proactively once a JWT access token is this close to `exp`.
    pub expiry_buffer: Duration,
    /// Transport retry policy for business calls.
    pub retry: RetryPolicy,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            retry: RetryPolicy::default(),
        }
    }
}

/// States of one authenticated call.
#[derive(Debug)]
pub enum CallState {
    /// Entry: consult the token store.
    NeedToken,
    /// Calling the refresh endpoint. `after_rejection` is set when the
    /// backend already rejected the access token once.
    Refreshing {
        refresh_token: String,
        after_rejection: bool,
    },
    /// A usable access token is in hand.
    TokenReady { access_token: String },
    /// First business call.
    Calling { access_token: String },
    /// The backend answered 401.
    AuthFailed,
    /// The single retry after a refresh.
    CallingRetry { access_token: String },
    Success(Value),
    Fatal(Error),
}

impl CallState {
    /// Short name for logs and traces.
    pub fn name(&self) -> &'static str {
        match self {
            CallState::NeedToken => "need_token",
            CallState::Refreshing { .. } => "refreshing",
            CallState::TokenReady { .. } => "token_ready",
            CallState::Calling { .. } => "calling",
            CallState::AuthFailed => "auth_failed",
            CallState::CallingRetry { .. } => "calling_retry",
            CallState::Success(_) => "success",
            CallState::Fatal(_) => "fatal",
        }
    }
}

/// One authenticated call attempt.
///
/// Created per outbound call and consumed when it resolves.
pub struct AuthenticatedCall<'a, E: Exchange + ?Sized> {
    exchange: &'a E,
    store: &'a TokenStore,
    policy: &'a CallPolicy,
    request: Option<ApiRequest>,
    path: Vec<&'static str>,
}

impl<'a, E: Exchange + ?Sized> AuthenticatedCall<'a, E> {
    /// Prepare a call for `request`.
    pub fn new(
        exchange: &'a E,
        store: &'a TokenStore,
        policy: &'a CallPolicy,
        request: ApiRequest,
    ) -> Self {
        Self {
            exchange,
            store,
            policy,
            request: Some(request),
            path: Vec::new(),
        }
    }

    /// Prepare a token acquisition with no business request attached.
    pub fn token_only(exchange: &'a E, store: &'a TokenStore, policy: &'a CallPolicy) -> Self {
        Self {
            exchange,
            store,
            policy,
            request: None,
            path: Vec::new(),
        }
    }

    /// Run until a fresh-enough access token is available.
    pub async fn acquire_token(mut self) -> Result<String> {
        let mut state = CallState::NeedToken;
        loop {
            self.path.push(state.name());
            state = match state {
                CallState::TokenReady { access_token } => return Ok(access_token),
                CallState::Fatal(e) => return Err(e),
                other => self.step(other).await,
            };
        }
    }

    /// Run the call to completion.
    pub async fn run(self) -> Result<Value> {
        self.run_traced().await.0
    }

    /// Run the call to completion, also returning the states visited.
    pub async fn run_traced(mut self) -> (Result<Value>, Vec<&'static str>) {
        let mut state = CallState::NeedToken;
        loop {
            self.path.push(state.name());
            state = match state {
                CallState::Success(body) => return (Ok(body), self.path),
                CallState::Fatal(e) => return (Err(e), self.path),
                other => self.step(other).await,
            };
        }
    }

    async fn step(&mut self, state: CallState) -> CallState {
        let next = match state {
            CallState::NeedToken => self.need_token(),
            CallState::Refreshing {
                refresh_token,
                after_rejection,
            } => self.refreshing(&refresh_token, after_rejection).await,
            CallState::TokenReady { access_token } => Ok(CallState::Calling { access_token }),
            CallState::Calling { access_token } => self.calling(&access_token, false).await,
            CallState::AuthFailed => self.auth_failed(),
            CallState::CallingRetry { access_token } => self.calling(&access_token, true).await,
            terminal @ (CallState::Success(_) | CallState::Fatal(_)) => Ok(terminal),
        };

        next.unwrap_or_else(CallState::Fatal)
    }

    fn need_token(&self) -> Result<CallState> {
        if let Some(credentials) = self.store.get_credentials()? {
            let stale = self.store.is_stale(self.policy.staleness_threshold)?;
            let expiring = credentials.expires_within(self.store.now(), self.policy.expiry_buffer);
            if !stale && !expiring {
                return Ok(CallState::TokenReady {
                    access_token: credentials.access_token,
                });
            }

            tracing::debug!(stale, expiring, "Access token due for refresh");
            return Ok(CallState::Refreshing {
                refresh_token: credentials.refresh_token,
                after_rejection: false,
            });
        }

        match self.store.refresh_token()? {
            Some(refresh_token) => {
                tracing::debug!("No usable access token, refreshing from stored refresh token");
                Ok(CallState::Refreshing {
                    refresh_token,
                    after_rejection: false,
                })
            }
            None => Err(Error::NotAuthenticated),
        }
    }

    async fn refreshing(&self, refresh_token: &str, after_rejection: bool) -> Result<CallState> {
        let tokens = match self.exchange.refresh(refresh_token).await {
            Ok(tokens) if !tokens.access.is_empty() => tokens,
            Ok(_) => {
                tracing::warn!("Refresh response carried no access token");
                self.store.clear_credentials()?;
                return Err(Error::AuthenticationExpired);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing session credentials");
                self.store.clear_credentials()?;
                return Err(Error::AuthenticationExpired);
            }
        };

        let rotated = tokens.refresh.filter(|r| !r.is_empty());
        let refresh_token = rotated.unwrap_or_else(|| refresh_token.to_string());
        let profile = self.store.user_profile()?.unwrap_or_default();
        let credentials = self
            .store
            .set_credentials(tokens.access, refresh_token, profile)?;
        tracing::info!("Access token refreshed");

        let access_token = credentials.access_token;
        Ok(if after_rejection {
            CallState::CallingRetry { access_token }
        } else {
            CallState::TokenReady { access_token }
        })
    }

    async fn calling(&self, access_token: &str, is_retry: bool) -> Result<CallState> {
        let Some(request) = self.request.as_ref() else {
            return Err(Error::Config("no request attached to call".to_string()));
        };

        let exchange = self.exchange;
        let response = with_retry(&self.policy.retry, request.path.as_str(), || {
            exchange.send(request, access_token)
        })
        .await?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            retry = is_retry,
            "API response"
        );

        if response.is_success() {
            return Ok(CallState::Success(response.json()?));
        }

        if response.is_auth_rejection() {
            if is_retry {
                tracing::warn!(
                    path = %request.path,
                    "Access token rejected after refresh, clearing session credentials"
                );
                self.store.clear_credentials()?;
                return Err(Error::AuthenticationExpired);
            }
            return Ok(CallState::AuthFailed);
        }

        Err(response.into_error())
    }

    fn auth_failed(&self) -> Result<CallState> {
        tracing::info!("Access token rejected, attempting refresh");
        match self.store.refresh_token()? {
            Some(refresh_token) => Ok(CallState::Refreshing {
                refresh_token,
                after_rejection: true,
            }),
            None => {
                self.store.clear_credentials()?;
                Err(Error::AuthenticationExpired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use forge_session::{ManualClock, MemorySession, SessionBackend, UserProfile};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted exchange: pops pre-programmed outcomes and records calls.
    #[derive(Default)]
    struct ScriptedExchange {
        sends: Mutex<VecDeque<Result<ApiResponse>>>,
        refreshes: Mutex<VecDeque<Result<RefreshedTokens>>>,
        sent_tokens: Mutex<Vec<String>>,
        refreshed_with: Mutex<Vec<String>>,
    }

    impl ScriptedExchange {
        fn on_send(self, outcome: Result<ApiResponse>) -> Self {
            self.sends.lock().push_back(outcome);
            self
        }

        fn on_refresh(self, outcome: Result<RefreshedTokens>) -> Self {
            self.refreshes.lock().push_back(outcome);
            self
        }

        fn sent_tokens(&self) -> Vec<String> {
            self.sent_tokens.lock().clone()
        }

        fn refreshed_with(&self) -> Vec<String> {
            self.refreshed_with.lock().clone()
        }
    }

    #[async_trait]
    impl Exchange for ScriptedExchange {
        async fn send(&self, _request: &ApiRequest, access_token: &str) -> Result<ApiResponse> {
            self.sent_tokens.lock().push(access_token.to_string());
            self.sends
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("unscripted send".into())))
        }

        async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens> {
            self.refreshed_with.lock().push(refresh_token.to_string());
            self.refreshes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("unscripted refresh".into())))
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn policy() -> CallPolicy {
        CallPolicy {
            staleness_threshold: Duration::from_secs(600),
            expiry_buffer: Duration::from_secs(60),
            retry: RetryPolicy {
                max_retries: 2,
                initial_backoff: Duration::from_millis(1),
            },
        }
    }

    fn store() -> (TokenStore, ManualClock) {
        let clock = ManualClock::new(t0());
        let store = TokenStore::with_clock(
            Arc::new(MemorySession::new()),
            Arc::new(clock.clone()),
        );
        (store, clock)
    }

    fn logged_in() -> (TokenStore, ManualClock) {
        let (store, clock) = store();
        store
            .set_credentials("A1", "R1", UserProfile::named("tech"))
            .unwrap();
        (store, clock)
    }

    fn ok(body: &str) -> Result<ApiResponse> {
        Ok(ApiResponse::new(200, body))
    }

    fn status(code: u16) -> Result<ApiResponse> {
        Ok(ApiResponse::new(code, r#"{"detail": "rejected"}"#))
    }

    fn tokens(access: &str, refresh: Option<&str>) -> Result<RefreshedTokens> {
        Ok(RefreshedTokens {
            access: access.to_string(),
            refresh: refresh.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_fresh_token_used_directly() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default().on_send(ok(r#"{"count": 3}"#));
        let policy = policy();

        let (result, path) =
            AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("clients/"))
                .run_traced()
                .await;

        assert_eq!(result.unwrap(), json!({"count": 3}));
        assert_eq!(path, vec!["need_token", "token_ready", "calling", "success"]);
        assert_eq!(exchange.sent_tokens(), vec!["A1"]);
        assert!(exchange.refreshed_with().is_empty());
    }

    #[tokio::test]
    async fn test_401_then_refresh_then_success() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(status(401))
            .on_send(ok(r#"{"id": 9}"#))
            .on_refresh(tokens("A2", Some("R2")));
        let policy = policy();

        let (result, path) =
            AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("clients/9/"))
                .run_traced()
                .await;

        assert_eq!(result.unwrap(), json!({"id": 9}));
        assert_eq!(
            path,
            vec![
                "need_token",
                "token_ready",
                "calling",
                "auth_failed",
                "refreshing",
                "calling_retry",
                "success"
            ]
        );
        assert_eq!(exchange.sent_tokens(), vec!["A1", "A2"]);

        let creds = store.get_credentials().unwrap().unwrap();
        assert_eq!(creds.access_token, "A2");
        assert_eq!(creds.refresh_token, "R2");
        assert_eq!(creds.user_profile.username, "tech");
    }

    #[tokio::test]
    async fn test_refresh_without_rotation_keeps_refresh_token() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(status(401))
            .on_send(ok("{}"))
            .on_refresh(tokens("A2", None));
        let policy = policy();

        AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await
            .unwrap();

        let creds = store.get_credentials().unwrap().unwrap();
        assert_eq!(creds.access_token, "A2");
        assert_eq!(creds.refresh_token, "R1");
    }

    #[tokio::test]
    async fn test_second_401_expires_session() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(status(401))
            .on_send(status(401))
            .on_refresh(tokens("A2", None));
        let policy = policy();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::AuthenticationExpired)));
        assert!(store.get_credentials().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
        assert_eq!(exchange.refreshed_with(), vec!["R1"]);
    }

    #[tokio::test]
    async fn test_refresh_rejected_never_retries_call() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(status(401))
            .on_refresh(Err(Error::Api {
                status: 401,
                message: "Token is invalid or expired".into(),
                body: Value::Null,
            }));
        let policy = policy();

        let (result, path) =
            AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
                .run_traced()
                .await;

        assert!(matches!(result, Err(Error::AuthenticationExpired)));
        assert_eq!(exchange.sent_tokens(), vec!["A1"]);
        assert_eq!(path.last(), Some(&"fatal"));
        assert!(!path.contains(&"calling_retry"));
        assert!(store.get_credentials().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_credentials_no_network() {
        let (store, _) = store();
        let exchange = ScriptedExchange::default();
        let policy = policy();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::NotAuthenticated)));
        assert!(exchange.sent_tokens().is_empty());
        assert!(exchange.refreshed_with().is_empty());
    }

    #[tokio::test]
    async fn test_staleness_scenario() {
        let (store, clock) = logged_in();
        let policy = policy();
        let threshold = policy.staleness_threshold;

        clock.advance(threshold - Duration::from_secs(1));
        let exchange = ScriptedExchange::default().on_send(ok("{}"));
        AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await
            .unwrap();
        assert_eq!(exchange.sent_tokens(), vec!["A1"]);
        assert!(exchange.refreshed_with().is_empty());

        clock.advance(Duration::from_secs(2));
        let exchange = ScriptedExchange::default()
            .on_refresh(tokens("A2", None))
            .on_send(ok("{}"));
        let (result, path) =
            AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
                .run_traced()
                .await;
        result.unwrap();
        assert_eq!(exchange.refreshed_with(), vec!["R1"]);
        assert_eq!(exchange.sent_tokens(), vec!["A2"]);
        assert_eq!(
            path,
            vec!["need_token", "refreshing", "token_ready", "calling", "success"]
        );

        let creds = store.get_credentials().unwrap().unwrap();
        assert_eq!(creds.issued_at, t0() + chrono::Duration::seconds(601));
    }

    #[tokio::test]
    async fn test_proactive_refresh_failure_expires_session() {
        let (store, clock) = logged_in();
        let policy = policy();
        clock.advance(policy.staleness_threshold);

        let exchange = ScriptedExchange::default().on_refresh(Err(Error::Api {
            status: 401,
            message: "expired".into(),
            body: Value::Null,
        }));

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::AuthenticationExpired)));
        assert!(exchange.sent_tokens().is_empty());
        assert!(store.get_credentials().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_401_after_proactive_refresh_gets_one_more_cycle() {
        let (store, clock) = logged_in();
        let policy = policy();
        clock.advance(policy.staleness_threshold);

        let exchange = ScriptedExchange::default()
            .on_refresh(tokens("A2", None))
            .on_send(status(401))
            .on_refresh(tokens("A3", None))
            .on_send(ok("[]"));

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert_eq!(result.unwrap(), json!([]));
        assert_eq!(exchange.sent_tokens(), vec!["A2", "A3"]);
    }

    #[tokio::test]
    async fn test_refresh_from_partial_record() {
        let backend = Arc::new(MemorySession::new());
        backend
            .modify(&mut |data| {
                data.insert(forge_session::keys::REFRESH_TOKEN.to_string(), json!("R9"));
            })
            .unwrap();
        let partial = TokenStore::with_clock(backend, Arc::new(ManualClock::new(t0())));

        let exchange = ScriptedExchange::default()
            .on_refresh(tokens("A9", None))
            .on_send(ok("{}"));
        let policy = policy();

        AuthenticatedCall::new(&exchange, &partial, &policy, ApiRequest::get("x/"))
            .run()
            .await
            .unwrap();

        assert_eq!(exchange.refreshed_with(), vec!["R9"]);
        let creds = partial.get_credentials().unwrap().unwrap();
        assert_eq!(creds.access_token, "A9");
        assert_eq!(creds.refresh_token, "R9");
    }

    #[tokio::test]
    async fn test_403_and_404_are_business_errors() {
        for code in [403, 404] {
            let (store, _) = logged_in();
            let exchange = ScriptedExchange::default().on_send(status(code));
            let policy = policy();

            let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
                .run()
                .await;

            match result {
                Err(Error::Api { status, message, .. }) => {
                    assert_eq!(status, code);
                    assert_eq!(message, "rejected");
                }
                other => panic!("unexpected result: {other:?}"),
            }
            assert!(exchange.refreshed_with().is_empty());
            assert!(store.get_credentials().unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(status(503))
            .on_send(ok("{}"));
        let policy = policy();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::Api { status: 503, .. })));
        assert_eq!(exchange.sent_tokens().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_retried_without_refresh() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(Err(Error::Transport("connection refused".into())))
            .on_send(Err(Error::Transport("connection refused".into())))
            .on_send(ok(r#"{"ok": true}"#));
        let policy = policy();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert_eq!(result.unwrap(), json!({"ok": true}));
        assert_eq!(exchange.sent_tokens(), vec!["A1", "A1", "A1"]);
        assert!(exchange.refreshed_with().is_empty());
    }

    #[tokio::test]
    async fn test_transport_errors_exhausted() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default();
        let policy = policy();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(exchange.sent_tokens().len(), 3);
        assert!(store.get_credentials().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_expires_session() {
        let (store, _) = logged_in();
        let exchange = ScriptedExchange::default()
            .on_send(status(401))
            .on_refresh(Err(Error::Transport("connection refused".into())));
        let policy = policy();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::AuthenticationExpired)));
        assert_eq!(exchange.refreshed_with(), vec!["R1"]);
        assert!(store.get_credentials().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_refresh_transport_failure_expires_session() {
        let (store, clock) = logged_in();
        let policy = policy();
        clock.advance(policy.staleness_threshold);
        let exchange = ScriptedExchange::default();

        let result = AuthenticatedCall::new(&exchange, &store, &policy, ApiRequest::get("x/"))
            .run()
            .await;

        assert!(matches!(result, Err(Error::AuthenticationExpired)));
        assert!(exchange.sent_tokens().is_empty());
        assert!(store.get_credentials().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_acquire_token() {
        let (store, clock) = logged_in();
        let policy = policy();
        let exchange = ScriptedExchange::default().on_refresh(tokens("A2", None));

        let token = AuthenticatedCall::token_only(&exchange, &store, &policy)
            .acquire_token()
            .await
            .unwrap();
        assert_eq!(token, "A1");

        clock.advance(policy.staleness_threshold);
        let token = AuthenticatedCall::token_only(&exchange, &store, &policy)
            .acquire_token()
            .await
            .unwrap();
        assert_eq!(token, "A2");
        assert!(exchange.sent_tokens().is_empty());
    }
}
