//! # ragmin_api
//!
//! HTTP API library for Ragmin: the management service under `/api/v1` and
//! the user application's SSO and account routes under `/v1/user`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use ragmin_core::sso::{CasClient, SsoError};
use ragmin_core::store::IdentityStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, roles, user};
use crate::middleware::auth::{attach_principal, require_admin, require_super_admin};
use crate::middleware::session::require_session;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Accounts, tenants, credentials and roles.
    pub store: Arc<dyn IdentityStore>,
    /// API configuration.
    pub config: ApiConfig,
    /// CAS provider client.
    pub cas: CasClient,
}

impl AppState {
    pub fn new(store: Arc<dyn IdentityStore>, config: ApiConfig) -> Result<Self, SsoError> {
        let cas = CasClient::new(config.cas.clone())?;
        Ok(Self { store, config, cas })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(management_router(&state))
        .merge(user_router(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn management_router(state: &AppState) -> Router<AppState> {
    // Login and /me: no guard
    let open = Router::new()
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::GET_USERS_ME, get(auth::me_handler));

    let admin = Router::new()
        .route(routes::GET_ROLES_ALL, get(roles::all_roles_handler))
        .route(routes::USER_ROLES, get(roles::user_roles_handler))
        .route_layer(from_fn(require_admin));

    let super_admin = Router::new()
        .route(routes::USER_ROLES, put(roles::set_user_roles_handler))
        .route_layer(from_fn(require_super_admin));

    Router::new()
        .merge(open)
        .merge(admin)
        .merge(super_admin)
        .layer(from_fn_with_state(state.clone(), attach_principal))
}

fn user_router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route(routes::GET_USER_LOGIN, get(user::login_handler))
        .route(routes::GET_USER_CAS_LOGIN_URL, get(user::cas_login_url_handler))
        .route(routes::GET_USER_CAS_CALLBACK, get(user::cas_callback_handler));

    let session = Router::new()
        .route(routes::GET_USER_LOGOUT, get(user::logout_handler))
        .route(routes::POST_USER_SETTING, post(user::setting_handler))
        .route(routes::GET_USER_INFO, get(user::info_handler))
        .route(routes::GET_USER_TENANT_INFO, get(user::tenant_info_handler))
        .route(routes::POST_USER_SET_TENANT_INFO, post(user::set_tenant_info_handler))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new().merge(public).merge(session)
}
