//! Password hashing via bcrypt.
//!
//! Clients never send plain passwords: the web app base64-encodes them first,
//! and stored hashes are computed over that encoded form.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Client-side password encoding: base64 of the UTF-8 bytes.
pub fn encode_password(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

/// Hash an (already encoded) password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify an (already encoded) password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Verify a plain password as typed into the management console.
pub fn verify_plain_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    verify_password(&encode_password(plain), hash)
}
