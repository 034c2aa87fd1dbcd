//! Session token issuing and verification (HS256, 8 h expiry).

use std::path::PathBuf;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info};

use super::AuthError;
use crate::models::auth::{Principal, TokenClaims};

/// Issue a signed session token expiring 8 hours from now.
pub fn issue_token(
    username: &str,
    user_id: Option<&str>,
    is_super_admin: bool,
    is_system_admin: bool,
    secret: &[u8],
) -> Result<String, AuthError> {
    let claims = TokenClaims::issued_at(
        username,
        user_id,
        is_super_admin,
        is_system_admin,
        Utc::now(),
    );
    encode_claims(&claims, secret)
}

/// Sign an explicit claim set.
pub fn encode_claims(claims: &TokenClaims, secret: &[u8]) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Decode and validate a token, returning its claims.
///
/// Fails closed: bad signature, malformed payload and expiry (no leeway) all
/// yield `None`.
pub fn decode_claims(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    match decode::<TokenClaims>(token, &key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!(error = %e, "session token rejected");
            None
        }
    }
}

/// Verify a session token and build the request principal.
pub fn verify_token(token: &str, secret: &[u8]) -> Option<Principal> {
    decode_claims(token, secret).map(Principal::from)
}

/// Resolve the signing secret: `MANAGEMENT_JWT_SECRET` → `JWT_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    for var in ["MANAGEMENT_JWT_SECRET", "JWT_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    // Generate and persist
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ragmin")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn issued_token_round_trips_flags() {
        let token = issue_token("admin", None, true, false, SECRET).unwrap();
        let principal = verify_token(&token, SECRET).expect("valid token");
        assert!(principal.is_super_admin);
        assert!(!principal.is_system_admin);
        assert_eq!(principal.subject, None);
        assert_eq!(principal.display_name, "admin");
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = TokenClaims::issued_at(
            "alice",
            Some("u1"),
            false,
            true,
            Utc::now() - Duration::hours(9),
        );
        let token = encode_claims(&claims, SECRET).unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }

    #[test]
    fn token_just_past_expiry_is_rejected() {
        let mut claims = TokenClaims::issued_at("alice", None, true, false, Utc::now());
        claims.exp = Utc::now().timestamp() - 1;
        let token = encode_claims(&claims, SECRET).unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("admin", None, true, false, b"other-secret").unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issue_token("alice", Some("u1"), false, false, SECRET).unwrap();
        let forged = issue_token("alice", Some("u1"), true, false, b"attacker").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        assert!(verify_token(&parts.join("."), SECRET).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not-a-jwt", SECRET).is_none());
        assert!(verify_token("", SECRET).is_none());
    }
}
