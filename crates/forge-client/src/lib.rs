//! Authenticated HTTP client for the Forge backend API.
//!
//! The backend issues short-lived JWT access tokens and longer-lived refresh
//! tokens. This crate keeps a user's calls working across access-token expiry
//! without the caller noticing: tokens are refreshed before they go stale,
//! and a call rejected with 401 is refreshed and retried exactly once.
//!
//! Credentials live in the caller's session through
//! [`forge_session::TokenStore`]; one [`ForgeClient`] is shared by every
//! session and bound to a store per request.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use forge_client::{ForgeClient, Error, Result};
//! use forge_session::{MemorySession, TokenStore};
//!
//! # async fn example() -> Result<()> {
//! let client = ForgeClient::builder()
//!     .base_url("http://localhost:8000/api/v1/")
//!     .build()?;
//!
//! let session = client.session(TokenStore::new(Arc::new(MemorySession::new())));
//!
//! let outcome = session.login("tech", "secret").await?;
//! if !outcome.success {
//!     eprintln!("{}", outcome.message);
//!     return Ok(());
//! }
//!
//! match session.get::<serde_json::Value>("work-orders/").await {
//!     Ok(orders) => println!("{orders}"),
//!     Err(e) if e.requires_login() => println!("Please log in again"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod machine;
mod request;
mod retry;
mod session;

pub use client::{AuthEndpoints, ClientBuilder, DEFAULT_BASE_URL, ForgeClient};
pub use error::{Error, Result};
pub use machine::{
    AuthenticatedCall, CallPolicy, CallState, DEFAULT_EXPIRY_BUFFER, DEFAULT_STALENESS_THRESHOLD,
    Exchange, RefreshedTokens,
};
pub use request::{ApiRequest, ApiResponse, extract_error_message};
pub use retry::{DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES, RetryPolicy, with_retry};
pub use session::{LoginOutcome, SessionClient};

pub use reqwest::Method;
