//! Session-scoped credential storage for the Forge API bridge.
//!
//! A web session carries the bearer credentials that the backend API issued
//! at login. This crate provides:
//! - [`SessionBackend`] implementations standing in for the framework's
//!   per-session key/value storage ([`MemorySession`], [`FileSession`])
//! - [`TokenStore`], the single source of truth for the session's
//!   [`Credentials`] (access token, refresh token, profile, issue time)
//! - A [`Clock`] seam so staleness checks can be driven deterministically
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use forge_session::{MemorySession, TokenStore, UserProfile};
//!
//! # fn example() -> forge_session::Result<()> {
//! let store = TokenStore::new(Arc::new(MemorySession::new()));
//! store.set_credentials("access", "refresh", UserProfile::default())?;
//!
//! assert!(store.get_credentials()?.is_some());
//! assert!(!store.is_stale(Duration::from_secs(60))?);
//!
//! store.clear_credentials()?;
//! assert!(store.is_stale(Duration::from_secs(60))?);
//! # Ok(())
//! # }
//! ```

mod backend;
mod clock;
mod credentials;
mod error;
mod store;

pub use backend::{FileSession, MemorySession, SessionBackend, SessionData};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{Credentials, UserProfile};
pub use error::{Error, Result};
pub use store::{SessionInfo, TokenStore, keys};
