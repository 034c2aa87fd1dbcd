//! Permission middleware for the management service.
//!
//! `attach_principal` never rejects: it only decodes a bearer token when one
//! is present and valid. Rejection is left to the per-route guards.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use ragmin_core::auth::AuthError;
use ragmin_core::auth::access::{Privilege, authorize};
use ragmin_core::auth::jwt::verify_token;
use ragmin_core::models::auth::Principal;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::routes;

/// Axum middleware: attaches the `Principal` of a valid
/// `Authorization: Bearer <token>` to request extensions.
///
/// Skipped for the login route and CORS pre-flight requests.
pub async fn attach_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == routes::POST_AUTH_LOGIN {
        return next.run(request).await;
    }

    let principal = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| verify_token(token, state.config.jwt_secret.as_bytes()));

    if let Some(principal) = principal {
        debug!(subject = ?principal.subject, name = %principal.display_name, "principal attached");
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

/// Guard: super-admin or system-admin.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    guard(request, next, Privilege::Admin).await
}

/// Guard: static super-admin only.
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, AppError> {
    guard(request, next, Privilege::SuperAdmin).await
}

async fn guard(request: Request, next: Next, required: Privilege) -> Result<Response, AppError> {
    authorize(request.extensions().get::<Principal>(), required)?;
    Ok(next.run(request).await)
}

/// Extractor for the request's principal; 401 when none is attached.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AppError::from(AuthError::Unauthenticated))
    }
}
