//! Authentication domain models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session token lifetime: 8 hours.
pub const SESSION_TOKEN_LIFETIME_HOURS: i64 = 8;

/// JWT claims embedded in management session tokens.
///
/// The payload is exactly these five fields; `user_id` is omitted for the
/// static super-admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Display name of the authenticated actor.
    pub username: String,
    /// Account id. Absent for the static super-admin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub is_system_admin: bool,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl TokenClaims {
    /// Build claims issued at `now`, expiring after the session lifetime.
    pub fn issued_at(
        username: &str,
        user_id: Option<&str>,
        is_super_admin: bool,
        is_system_admin: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.to_string(),
            user_id: user_id.map(str::to_string),
            is_super_admin,
            is_system_admin,
            exp: (now + Duration::hours(SESSION_TOKEN_LIFETIME_HOURS)).timestamp(),
        }
    }
}

/// The authenticated actor of one management request.
///
/// Built by the permission middleware from a verified token and handed to
/// handlers through request extensions. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub subject: Option<String>,
    pub display_name: String,
    pub is_super_admin: bool,
    pub is_system_admin: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    /// Super-admin or system-admin.
    pub fn is_admin(&self) -> bool {
        self.is_super_admin || self.is_system_admin
    }
}

impl From<TokenClaims> for Principal {
    fn from(claims: TokenClaims) -> Self {
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self {
            subject: claims.user_id,
            display_name: claims.username,
            is_super_admin: claims.is_super_admin,
            is_system_admin: claims.is_system_admin,
            issued_at: expires_at - Duration::hours(SESSION_TOKEN_LIFETIME_HOURS),
            expires_at,
        }
    }
}
