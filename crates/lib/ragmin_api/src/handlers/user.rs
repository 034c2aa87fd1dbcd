//! User application handlers: SSO login/logout and the account's own
//! profile and tenant settings.

use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{error, info};
use url::form_urlencoded;

use ragmin_core::models::account::TenantModelUpdate;

use crate::AppState;
use crate::middleware::session::SessionAccount;
use crate::services::cookies::{clear_session_cookie, session_cookie};
use crate::services::envelope::{JsonResult, RetCode};
use crate::services::{settings, sso};

/// 302 to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// 302 to the site root with one query parameter.
fn found_root(key: &str, value: &str) -> Response {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    found(&format!("/?{query}"))
}

/// `GET /v1/user/login`: send the browser to the provider.
pub async fn login_handler(State(state): State<AppState>) -> Response {
    match state.cas.config().authorization_url() {
        Ok(url) => found(&url),
        Err(e) => {
            error!(error = %e, "cannot build CAS authorize URL");
            found_root("error", &e.to_string())
        }
    }
}

/// `GET /v1/user/cas_login_url`: the provider URL for frontend redirects.
pub async fn cas_login_url_handler(State(state): State<AppState>) -> JsonResult {
    match state.cas.config().authorization_url() {
        Ok(url) => JsonResult::ok(json!({ "url": url })),
        Err(e) => JsonResult::error(RetCode::ExceptionError, e.to_string()),
    }
}

/// Provider callback query. A `state` parameter may be present and is ignored.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// `GET /v1/user/cas_callback`: provider redirect target.
///
/// Always answers 302: to `/?auth=<access_token>` with the session cookie
/// set, or to `/?error=<message>`.
pub async fn cas_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    match sso::complete_login(&state, params.code.as_deref()).await {
        Ok(account) => {
            let token = account.access_token.unwrap_or_default();
            let jar = jar.add(session_cookie(&token));
            (jar, found_root("auth", &token)).into_response()
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "CAS login failed");
            found_root("error", &e.to_string())
        }
    }
}

/// `GET /v1/user/logout`: end the local session, then the provider's.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(SessionAccount(account)): Extension<SessionAccount>,
    jar: CookieJar,
) -> Result<Response, JsonResult> {
    state.store.clear_access_token(&account.id).await?;
    info!(user_id = %account.id, "User logged out");
    let jar = jar.add(clear_session_cookie());
    Ok((jar, found(&state.cas.config().logout_redirect_url())).into_response())
}

/// `GET /v1/user/info`
pub async fn info_handler(
    Extension(SessionAccount(account)): Extension<SessionAccount>,
) -> JsonResult {
    JsonResult::ok(account)
}

/// `POST /v1/user/setting`: profile fields and password change.
pub async fn setting_handler(
    State(state): State<AppState>,
    Extension(SessionAccount(account)): Extension<SessionAccount>,
    Json(body): Json<Map<String, Value>>,
) -> Result<JsonResult, JsonResult> {
    let update = settings::profile_update(&account, &body)?;
    if !update.is_empty() {
        state.store.update_profile(&account.id, &update).await?;
    }
    Ok(JsonResult::ok(true))
}

/// `GET /v1/user/tenant_info`: model configuration of the owned tenant.
pub async fn tenant_info_handler(
    State(state): State<AppState>,
    Extension(SessionAccount(account)): Extension<SessionAccount>,
) -> Result<JsonResult, JsonResult> {
    match state.store.owned_tenant_info(&account.id).await? {
        Some(info) => Ok(JsonResult::ok(info)),
        None => Err(JsonResult::data_error("Tenant not found!")),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantInfoRequest {
    pub tenant_id: Option<String>,
    pub llm_id: Option<String>,
    pub embd_id: Option<String>,
    pub asr_id: Option<String>,
    pub img2txt_id: Option<String>,
    pub rerank_id: Option<String>,
    pub parser_ids: Option<String>,
}

impl TenantInfoRequest {
    /// Split into the target tenant and the update, or list the missing
    /// required fields.
    fn into_update(self) -> Result<(String, TenantModelUpdate), Vec<&'static str>> {
        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: Option<String>| {
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };
        let tenant_id = take("tenant_id", self.tenant_id);
        let asr_id = take("asr_id", self.asr_id);
        let embd_id = take("embd_id", self.embd_id);
        let img2txt_id = take("img2txt_id", self.img2txt_id);
        let llm_id = take("llm_id", self.llm_id);
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok((
            tenant_id,
            TenantModelUpdate {
                llm_id,
                embd_id,
                asr_id,
                img2txt_id,
                rerank_id: self.rerank_id,
                parser_ids: self.parser_ids,
            },
        ))
    }
}

/// `POST /v1/user/set_tenant_info`: caller must belong to the tenant.
pub async fn set_tenant_info_handler(
    State(state): State<AppState>,
    Extension(SessionAccount(account)): Extension<SessionAccount>,
    Json(body): Json<TenantInfoRequest>,
) -> Result<JsonResult, JsonResult> {
    let (tenant_id, update) = body.into_update().map_err(|missing| {
        JsonResult::argument_error(format!(
            "required argument are missing: {}",
            missing.join(",")
        ))
    })?;
    if !state.store.is_tenant_member(&account.id, &tenant_id).await? {
        return Err(JsonResult::error(
            RetCode::AuthenticationError,
            "No authorization.",
        ));
    }
    state.store.update_tenant_models(&tenant_id, &update).await?;
    info!(user_id = %account.id, %tenant_id, "tenant models updated");
    Ok(JsonResult::ok(true))
}
