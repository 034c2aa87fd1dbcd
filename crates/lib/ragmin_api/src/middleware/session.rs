//! Session middleware for the user application.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ragmin_core::auth::AuthError;
use ragmin_core::models::account::Account;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::session_token;

/// The account whose `access_token` opened this request's session.
#[derive(Debug, Clone)]
pub struct SessionAccount(pub Account);

/// Axum middleware: resolves the presented `access_token` to an enabled
/// account and injects `SessionAccount`, or answers 401.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers())
        .ok_or_else(|| AppError::from(AuthError::Unauthenticated))?;
    let account = state
        .store
        .account_by_access_token(&token)
        .await?
        .ok_or_else(|| AppError::from(AuthError::Unauthenticated))?;

    request.extensions_mut().insert(SessionAccount(account));
    Ok(next.run(request).await)
}
