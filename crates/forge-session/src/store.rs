//! The session token store.
//!
//! [`TokenStore`] owns reading and writing the authentication record inside a
//! session. Every other component asks it for credentials rather than poking
//! at session keys.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{SessionBackend, SessionData};
use crate::clock::{Clock, SystemClock};
use crate::credentials::{Credentials, UserProfile, redact};
use crate::error::{Error, Result};

/// Session keys used for the authentication record.
pub mod keys {
    /// Access token.
    pub const AUTH_TOKEN: &str = "auth_token";
    /// Refresh token.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// RFC 3339 time the access token was acquired.
    pub const TOKEN_TIMESTAMP: &str = "token_timestamp";
    /// Cached user profile.
    pub const USER_DATA: &str = "user_data";

    /// Every key owned by the token store.
    pub const ALL: [&str; 4] = [AUTH_TOKEN, REFRESH_TOKEN, TOKEN_TIMESTAMP, USER_DATA];
}

/// Credential store bound to one session.
#[derive(Debug, Clone)]
pub struct TokenStore {
    backend: Arc<dyn SessionBackend>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    /// Create a store over `backend` using the system clock.
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(backend: Arc<dyn SessionBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Return the stored credentials, or `None` if absent or partial.
    pub fn get_credentials(&self) -> Result<Option<Credentials>> {
        let data = self.backend.read()?;
        Ok(parse_credentials(&data))
    }

    /// Store a complete credential record stamped with the current time.
    ///
    /// Overwrites any previous record in a single backend write.
    pub fn set_credentials(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user_profile: UserProfile,
    ) -> Result<Credentials> {
        let credentials = Credentials {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            user_profile,
            issued_at: self.clock.now(),
        };

        if credentials.access_token.is_empty() {
            return Err(Error::InvalidCredentials("access token is empty".to_string()));
        }
        if credentials.refresh_token.is_empty() {
            return Err(Error::InvalidCredentials("refresh token is empty".to_string()));
        }

        let profile = serde_json::to_value(&credentials.user_profile)?;
        let issued_at = credentials.issued_at.to_rfc3339();
        self.backend.modify(&mut |data| {
            data.insert(
                keys::AUTH_TOKEN.to_string(),
                credentials.access_token.clone().into(),
            );
            data.insert(
                keys::REFRESH_TOKEN.to_string(),
                credentials.refresh_token.clone().into(),
            );
            data.insert(keys::TOKEN_TIMESTAMP.to_string(), issued_at.clone().into());
            data.insert(keys::USER_DATA.to_string(), profile.clone());
        })?;

        tracing::debug!(
            access_token = %redact(&credentials.access_token),
            issued_at = %credentials.issued_at,
            "Credentials stored"
        );
        Ok(credentials)
    }

    /// Remove the credential record from the session.
    pub fn clear_credentials(&self) -> Result<()> {
        self.backend.modify(&mut |data| {
            for key in keys::ALL {
                data.remove(key);
            }
        })?;
        tracing::debug!("Credentials cleared");
        Ok(())
    }

    /// Whether the access token is at least `threshold` old, or absent.
    pub fn is_stale(&self, threshold: Duration) -> Result<bool> {
        Ok(match self.get_credentials()? {
            Some(credentials) => credentials.is_stale_at(self.clock.now(), threshold),
            None => true,
        })
    }

    /// The stored refresh token, even if the rest of the record is missing.
    pub fn refresh_token(&self) -> Result<Option<String>> {
        let data = self.backend.read()?;
        Ok(non_empty_str(&data, keys::REFRESH_TOKEN).map(str::to_string))
    }

    /// The cached user profile, if any.
    pub fn user_profile(&self) -> Result<Option<UserProfile>> {
        let data = self.backend.read()?;
        Ok(parse_profile(&data))
    }

    /// Summarize the session's authentication state.
    pub fn session_info(&self) -> Result<SessionInfo> {
        let data = self.backend.read()?;
        let now = self.clock.now();
        let credentials = parse_credentials(&data);

        Ok(SessionInfo {
            authenticated: credentials.is_some(),
            has_refresh_token: non_empty_str(&data, keys::REFRESH_TOKEN).is_some(),
            issued_at: credentials.as_ref().map(|c| c.issued_at),
            token_age_secs: credentials.as_ref().map(|c| c.age(now).as_secs()),
            access_expires_at: credentials.as_ref().and_then(Credentials::access_expires_at),
            profile: parse_profile(&data),
        })
    }
}

/// Snapshot of a session's authentication state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    /// A complete credential record is present.
    pub authenticated: bool,
    /// A refresh token is present (possibly without an access token).
    pub has_refresh_token: bool,
    pub issued_at: Option<DateTime<Utc>>,
    pub token_age_secs: Option<u64>,
    /// Expiry embedded in a JWT access token.
    pub access_expires_at: Option<DateTime<Utc>>,
    pub profile: Option<UserProfile>,
}

fn non_empty_str<'a>(data: &'a SessionData, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

fn parse_profile(data: &SessionData) -> Option<UserProfile> {
    let value = data.get(keys::USER_DATA)?;
    match serde_json::from_value(value.clone()) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed user profile in session");
            None
        }
    }
}

fn parse_credentials(data: &SessionData) -> Option<Credentials> {
    let access = non_empty_str(data, keys::AUTH_TOKEN);
    let refresh = non_empty_str(data, keys::REFRESH_TOKEN);
    let issued_at = non_empty_str(data, keys::TOKEN_TIMESTAMP)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    match (access, refresh, issued_at) {
        (Some(access), Some(refresh), Some(issued_at)) => Some(Credentials {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            user_profile: parse_profile(data).unwrap_or_default(),
            issued_at,
        }),
        (None, None, None) => None,
        _ => {
            tracing::debug!("Partial credential record in session, treating as unauthenticated");
            None
        }
    }
}
