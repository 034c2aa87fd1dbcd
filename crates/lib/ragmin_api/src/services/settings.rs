//! `/v1/user/setting` request interpretation.

use ragmin_core::auth::password::{hash_password, verify_password};
use ragmin_core::models::account::{Account, ProfileUpdate};
use serde_json::{Map, Value};
use tracing::warn;

use super::envelope::{JsonResult, RetCode};

/// Keys that never change through the settings endpoint.
const PROTECTED_KEYS: [&str; 10] = [
    "password",
    "new_password",
    "email",
    "status",
    "is_superuser",
    "login_channel",
    "is_anonymous",
    "is_active",
    "is_authenticated",
    "last_login_time",
];

/// Turn a settings body into a profile update.
///
/// `password` (client-encoded) must match the stored hash before
/// `new_password` is accepted. Unknown keys are argument errors.
pub fn profile_update(
    account: &Account,
    body: &Map<String, Value>,
) -> Result<ProfileUpdate, JsonResult> {
    let mut update = ProfileUpdate::default();

    if let Some(current) = non_empty_str(body, "password")? {
        let verified = match account.password.as_deref() {
            Some(hash) => verify_password(current, hash).unwrap_or_else(|e| {
                warn!(user_id = %account.id, error = %e, "stored password hash is unreadable");
                false
            }),
            None => false,
        };
        if !verified {
            return Err(JsonResult::error(RetCode::AuthenticationError, "Password error!"));
        }
        if let Some(new_password) = non_empty_str(body, "new_password")? {
            update.password_hash = Some(hash_password(new_password)?);
        }
    }

    for (key, value) in body {
        if PROTECTED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let slot = match key.as_str() {
            "nickname" => &mut update.nickname,
            "avatar" => &mut update.avatar,
            "language" => &mut update.language,
            "color_schema" => &mut update.color_schema,
            "timezone" => &mut update.timezone,
            other => {
                return Err(JsonResult::argument_error(format!("Unsupported setting: {other}")));
            }
        };
        let Value::String(s) = value else {
            return Err(JsonResult::argument_error(format!("`{key}` must be a string")));
        };
        *slot = Some(s.clone());
    }
    Ok(update)
}

fn non_empty_str<'a>(
    body: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, JsonResult> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(JsonResult::argument_error(format!("`{key}` must be a string"))),
    }
}
