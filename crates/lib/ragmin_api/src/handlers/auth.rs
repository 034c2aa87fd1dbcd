//! Management authentication handlers.

use axum::Json;
use axum::extract::State;
use ragmin_core::models::auth::Principal;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentPrincipal;
use crate::services::auth;
use crate::services::envelope::ApiReply;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}

/// `POST /api/v1/auth/login`: static super-admin or database system admin.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<ApiReply<TokenData>>> {
    let token = auth::login(
        state.store.as_ref(),
        &state.config,
        &body.username,
        &body.password,
    )
    .await?;
    Ok(ApiReply::data(TokenData { token }, "Login successful"))
}

/// `GET /api/v1/users/me`: the caller's principal.
pub async fn me_handler(
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Json<ApiReply<Principal>> {
    ApiReply::data(principal, "success")
}
