//! SSO callback flow: code → provider token → profile → account.

use chrono::Utc;
use ragmin_core::ids::new_id;
use ragmin_core::models::account::Account;
use ragmin_core::provision::provision_account;
use ragmin_core::sso::SsoError;
use tracing::{info, warn};

use crate::AppState;

/// Finish a provider login and return the signed-in account.
///
/// The returned account carries the fresh `access_token` of this login.
pub async fn complete_login(state: &AppState, code: Option<&str>) -> Result<Account, SsoError> {
    let code = code.filter(|c| !c.is_empty()).ok_or(SsoError::MissingCode)?;

    let provider_token = state.cas.exchange_code(code).await?;
    let profile = state.cas.fetch_profile(&provider_token).await?;
    let identity = profile.identity(&state.config.cas.email_domain)?;

    let existing = state.store.accounts_by_email(&identity.email).await?;
    let Some(mut account) = existing.into_iter().next() else {
        return Ok(provision_account(
            state.store.as_ref(),
            &new_id(),
            &identity,
            &state.config.tenant_defaults,
        )
        .await?);
    };

    let token = new_id();
    let now = Utc::now().naive_utc();
    let updated = state.store.record_login(&account.id, &token, now).await?;
    if updated == 0 {
        warn!(user_id = %account.id, "login recorded no rows");
    }
    account.access_token = Some(token);
    account.last_login_time = Some(now);
    info!(email = %account.email, user_id = %account.id, "User logged in via SSO");
    Ok(account)
}
