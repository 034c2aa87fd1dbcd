//! Management login: static super-admin first, then database system admins.

use ragmin_core::auth::jwt::issue_token;
use ragmin_core::auth::password::verify_plain_password;
use ragmin_core::store::IdentityStore;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};

const MISSING_CREDENTIALS: &str = "Username and password are required";
const UNKNOWN_USER: &str = "User does not exist";
const WRONG_PASSWORD: &str = "Wrong password";
const NOT_SYSTEM_ADMIN: &str = "You do not have management privileges";

/// Authenticate a management console login and issue a session token.
///
/// `username` is matched against the static super-admin first; otherwise it
/// is treated as the email of an enabled system-admin account.
pub async fn login(
    store: &dyn IdentityStore,
    config: &ApiConfig,
    username: &str,
    password: &str,
) -> AppResult<String> {
    if username.is_empty() || password.is_empty() {
        return Err(AppError::LoginFailed(MISSING_CREDENTIALS.into()));
    }
    let secret = config.jwt_secret.as_bytes();

    if username == config.admin_username && password == config.admin_password {
        info!(%username, "super-admin login");
        return Ok(issue_token(username, None, true, false, secret)?);
    }

    let account = store
        .active_account_by_email(username)
        .await
        .map_err(|e| AppError::LoginFailed(e.to_string()))?
        .ok_or_else(|| AppError::LoginFailed(UNKNOWN_USER.into()))?;

    let matches = match account.password.as_deref() {
        Some(hash) => verify_plain_password(password, hash).unwrap_or_else(|e| {
            warn!(user_id = %account.id, error = %e, "stored password hash is unreadable");
            false
        }),
        None => false,
    };
    if !matches {
        return Err(AppError::LoginFailed(WRONG_PASSWORD.into()));
    }
    if !account.is_system_admin {
        return Err(AppError::LoginFailed(NOT_SYSTEM_ADMIN.into()));
    }

    info!(user_id = %account.id, "system-admin login");
    Ok(issue_token(
        &account.nickname,
        Some(&account.id),
        false,
        true,
        secret,
    )?)
}
