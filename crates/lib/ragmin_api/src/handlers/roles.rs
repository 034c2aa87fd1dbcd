//! Role assignment handlers.

use axum::Json;
use axum::extract::{Path, State};
use ragmin_core::models::role::Role;
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentPrincipal;
use crate::services::envelope::ApiReply;

#[derive(Debug, Deserialize)]
pub struct SetRolesRequest {
    #[serde(default)]
    pub role_ids: Vec<String>,
}

/// `GET /api/v1/roles/all`: enabled roles, default role first.
pub async fn all_roles_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiReply<Vec<Role>>>> {
    let roles = state.store.active_roles().await?;
    Ok(ApiReply::data(roles, "Roles fetched"))
}

/// `GET /api/v1/users/{user_id}/roles`
pub async fn user_roles_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiReply<Vec<Role>>>> {
    let roles = state.store.roles_of_user(&user_id).await?;
    Ok(ApiReply::data(roles, "User roles fetched"))
}

/// `PUT /api/v1/users/{user_id}/roles`: replace the full role set.
pub async fn set_user_roles_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<String>,
    Json(body): Json<SetRolesRequest>,
) -> AppResult<Json<ApiReply<()>>> {
    state
        .store
        .replace_user_roles(&user_id, &body.role_ids)
        .await?;
    info!(%user_id, roles = ?body.role_ids, by = %principal.display_name, "user roles replaced");
    Ok(ApiReply::message("User roles updated"))
}
