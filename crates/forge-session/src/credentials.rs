//! Credential and profile value types.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credentials held by one session.
///
/// Access and refresh tokens always travel together; a session holding only
/// one of them has no `Credentials` at all.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    /// Short-lived bearer token for resource calls.
    pub access_token: String,
    /// Longer-lived token used only to mint new access tokens.
    pub refresh_token: String,
    /// Cached snapshot of the authenticated identity.
    pub user_profile: UserProfile,
    /// When the access token was last acquired.
    pub issued_at: DateTime<Utc>,
}

impl Credentials {
    /// Time elapsed since the access token was acquired, as of `now`.
    ///
    /// Zero if `issued_at` lies in the future.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.issued_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the access token is at least `threshold` old as of `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.age(now) >= threshold
    }

    /// Expiry embedded in the access token, if it is a JWT with an `exp` claim.
    ///
    /// The signature is not checked; this is only used to schedule refreshes.
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        jwt_expiry(&self.access_token)
    }

    /// Whether the access token's embedded expiry falls within `buffer` of `now`.
    ///
    /// Opaque (non-JWT) tokens never report as expiring.
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        let Some(expires_at) = self.access_expires_at() else {
            return false;
        };
        // A buffer reaching past the representable range counts as expiring.
        chrono::Duration::from_std(buffer)
            .ok()
            .and_then(|buffer| expires_at.checked_sub_signed(buffer))
            .is_none_or(|refresh_at| now >= refresh_at)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("user_profile", &self.user_profile)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Shorten a token for log output.
pub(crate) fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}

fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp(seconds, 0)
}

// ============================================================================
// UserProfile
// ============================================================================

/// Denormalized snapshot of the authenticated user.
///
/// Mirrors the `user` object the backend returns at login. Every field is
/// optional on the wire so older backends still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user identifier.
    #[serde(default, alias = "user_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    /// Group names the user belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Permission codenames (e.g. `core.add_client`).
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserProfile {
    /// Create a profile with only a username.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Full name if known, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Check group membership.
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Check a permission. Superusers hold every permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superuser || self.permissions.iter().any(|p| p == permission)
    }
}
