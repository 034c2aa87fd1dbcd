//! Shared fixtures: in-memory store, router and a fake CAS provider.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{Request, Response};
use axum::routing::get;
use ragmin_api::config::ApiConfig;
use ragmin_api::{AppState, router};
use ragmin_core::auth::password::{encode_password, hash_password};
use ragmin_core::models::account::{Account, CatalogModel};
use ragmin_core::provision::TenantDefaults;
use ragmin_core::sso::CasConfig;
use ragmin_core::store::MemoryStore;
use serde_json::{Value, json};
use std::collections::HashMap;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const FACTORY: &str = "Tongyi-Qianwen";

pub fn config(cas: CasConfig) -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "mysql://unused".into(),
        jwt_secret: SECRET.into(),
        admin_username: "admin".into(),
        admin_password: "12345678".into(),
        cas,
        tenant_defaults: TenantDefaults {
            llm_id: "qwen-plus@Tongyi-Qianwen".into(),
            embd_id: "text-embedding-v2@Tongyi-Qianwen".into(),
            llm_factory: FACTORY.into(),
            api_key: "sk-shared".into(),
            base_url: "https://llm.example.edu/v1".into(),
            ..TenantDefaults::default()
        },
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub app: Router,
}

impl TestApp {
    pub fn new(cas: CasConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.seed_catalog_model(CatalogModel {
            fid: FACTORY.into(),
            llm_name: "qwen-plus".into(),
            model_type: "chat".into(),
            max_tokens: None,
        });
        let state = AppState::new(store.clone(), config(cas)).expect("app state");
        Self {
            store,
            app: router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("request")
    }
}

pub fn get_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// An enabled account with a password hash over `base64(password)`.
pub fn account(id: &str, email: &str, password: &str, is_system_admin: bool) -> Account {
    Account {
        id: id.into(),
        email: email.into(),
        nickname: format!("{id}-nick"),
        password: Some(hash_password(&encode_password(password)).expect("hash")),
        avatar: None,
        language: None,
        color_schema: None,
        timezone: None,
        access_token: Some(format!("{id}-token")),
        login_channel: Some("password".into()),
        status: Some("1".into()),
        is_superuser: false,
        is_system_admin,
        last_login_time: None,
        create_time: None,
        update_time: None,
    }
}

/// Start a fake CAS provider on an ephemeral port.
///
/// Codes: `good` → `AT-good`, `carol` → `AT-carol`, `rejected` → provider
/// error, `empty` → no token, `badprofile` → token whose profile errors.
pub async fn spawn_fake_cas() -> CasConfig {
    async fn token(Query(q): Query<HashMap<String, String>>) -> axum::Json<Value> {
        let body = match q.get("code").map(String::as_str) {
            Some("good") => json!({"access_token": "AT-good", "token_type": "bearer"}),
            Some("carol") => json!({"access_token": "AT-carol"}),
            Some("badprofile") => json!({"access_token": "AT-bad"}),
            Some("rejected") => json!({"errorcode": 40029, "errormsg": "invalid code"}),
            _ => json!({"token_type": "bearer"}),
        };
        axum::Json(body)
    }

    async fn profile(Query(q): Query<HashMap<String, String>>) -> axum::Json<Value> {
        let body = match q.get("access_token").map(String::as_str) {
            Some("AT-good") => {
                json!({"id": "u1", "attributes": ["CODE=u1", "XM=Alice", "DWPF=CS"]})
            }
            Some("AT-carol") => {
                json!({"id": "c7", "attributes": [{"CODE": "c7"}, {"XM": "Carol"}]})
            }
            _ => json!({"errorcode": 40001, "errormsg": "access token expired"}),
        };
        axum::Json(body)
    }

    let provider = Router::new()
        .route("/oauth2.0/accessToken", get(token))
        .route("/oauth2.0/profile", get(profile));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake CAS");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, provider).await.expect("fake CAS");
    });

    let base = format!("http://{addr}");
    CasConfig {
        authorize_url: format!("{base}/oauth2.0/authorize"),
        access_token_url: format!("{base}/oauth2.0/accessToken"),
        profile_url: format!("{base}/oauth2.0/profile"),
        logout_url: format!("{base}/logout"),
        client_id: "ragmin".into(),
        client_secret: "s3cret".into(),
        redirect_uri: "https://rag.example.edu/v1/user/cas_callback".into(),
        email_domain: "zime.edu.cn".into(),
    }
}
