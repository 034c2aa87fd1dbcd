//! Management login, principal attachment and privilege guards.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::any;
use ragmin_api::AppState;
use ragmin_api::middleware::auth::attach_principal;
use ragmin_core::models::auth::Principal;
use ragmin_core::store::MemoryStore;
use tower::ServiceExt;
use chrono::{Duration, Utc};
use ragmin_core::auth::jwt::{encode_claims, issue_token, verify_token};
use ragmin_core::models::auth::TokenClaims;
use ragmin_core::models::role::Role;
use ragmin_core::sso::CasConfig;
use serde_json::json;

use common::{SECRET, TestApp, account, body_json, get_request, json_request};

fn app() -> TestApp {
    TestApp::new(CasConfig::default())
}

fn super_admin_token() -> String {
    issue_token("admin", None, true, false, SECRET.as_bytes()).unwrap()
}

fn system_admin_token() -> String {
    issue_token("ops", Some("ops-id"), false, true, SECRET.as_bytes()).unwrap()
}

fn plain_token() -> String {
    issue_token("bob", Some("bob-id"), false, false, SECRET.as_bytes()).unwrap()
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({"username": username, "password": password}),
        ))
        .await;
    (resp.status(), body_json(resp).await)
}

#[tokio::test]
async fn static_admin_gets_super_admin_token() {
    let app = app();
    let (status, body) = login(&app, "admin", "12345678").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);

    let token = body["data"]["token"].as_str().unwrap();
    let principal = verify_token(token, SECRET.as_bytes()).unwrap();
    assert!(principal.is_super_admin);
    assert!(!principal.is_system_admin);
    assert_eq!(principal.subject, None);
    assert_eq!(principal.display_name, "admin");
}

#[tokio::test]
async fn database_system_admin_gets_system_admin_token() {
    let app = app();
    app.store
        .seed_account(account("ops-id", "ops@zime.edu.cn", "pw-ops", true));

    let (status, body) = login(&app, "ops@zime.edu.cn", "pw-ops").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap();
    let principal = verify_token(token, SECRET.as_bytes()).unwrap();
    assert!(principal.is_system_admin);
    assert!(!principal.is_super_admin);
    assert_eq!(principal.subject.as_deref(), Some("ops-id"));
    assert_eq!(principal.display_name, "ops-id-nick");
}

#[tokio::test]
async fn login_failures_are_400_with_code_1() {
    let app = app();
    app.store
        .seed_account(account("bob-id", "bob@zime.edu.cn", "pw-bob", false));

    let cases = [
        ("", "x", "Username and password are required"),
        ("nobody@zime.edu.cn", "x", "User does not exist"),
        ("bob@zime.edu.cn", "wrong", "Wrong password"),
        ("bob@zime.edu.cn", "pw-bob", "You do not have management privileges"),
        ("admin", "wrong", "User does not exist"),
    ];
    for (username, password, message) in cases {
        let (status, body) = login(&app, username, password).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{username}");
        assert_eq!(body["code"], 1);
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn disabled_account_cannot_log_in() {
    let app = app();
    let mut disabled = account("ops-id", "ops@zime.edu.cn", "pw-ops", true);
    disabled.status = Some("0".into());
    app.store.seed_account(disabled);

    let (status, body) = login(&app, "ops@zime.edu.cn", "pw-ops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User does not exist");
}

#[tokio::test]
async fn login_route_ignores_a_bad_bearer() {
    let app = app();
    let resp = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            Some("garbage"),
            json!({"username": "admin", "password": "12345678"}),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn principal_seen(request: Request) -> String {
    request.extensions().get::<Principal>().is_some().to_string()
}

#[tokio::test]
async fn preflight_requests_skip_principal_attachment() {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        common::config(CasConfig::default()),
    )
    .unwrap();
    let app = Router::new()
        .route("/api/v1/roles/all", any(principal_seen))
        .layer(from_fn_with_state(state.clone(), attach_principal))
        .with_state(state);

    for (method, expected) in [("OPTIONS", "false"), ("GET", "true")] {
        let request = axum::http::Request::builder()
            .method(method)
            .uri("/api/v1/roles/all")
            .header("authorization", format!("Bearer {}", super_admin_token()))
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{method}");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], expected.as_bytes(), "{method}");
    }
}

#[tokio::test]
async fn me_echoes_the_principal() {
    let app = app();
    let resp = app
        .send(get_request("/api/v1/users/me", Some(&plain_token())))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["display_name"], "bob");
    assert_eq!(body["data"]["subject"], "bob-id");
    assert_eq!(body["data"]["is_super_admin"], false);
}

#[tokio::test]
async fn me_without_token_is_401() {
    let app = app();
    let resp = app.send(get_request("/api/v1/users/me", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["code"], 401);
}

#[tokio::test]
async fn expired_and_foreign_tokens_are_treated_as_absent() {
    let app = app();
    let expired = encode_claims(
        &TokenClaims {
            username: "admin".into(),
            user_id: None,
            is_super_admin: true,
            is_system_admin: false,
            exp: (Utc::now() - Duration::seconds(1)).timestamp(),
        },
        SECRET.as_bytes(),
    )
    .unwrap();
    let foreign = issue_token("admin", None, true, false, b"other-secret").unwrap();

    for token in [expired, foreign] {
        let resp = app
            .send(get_request("/api/v1/roles/all", Some(&token)))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn admin_guard_admits_both_admin_kinds() {
    let app = app();
    app.store.seed_role(
        Role {
            id: "r-b".into(),
            name: "Teachers".into(),
            is_default: false,
        },
        true,
    );
    app.store.seed_role(
        Role {
            id: "r-a".into(),
            name: "Students".into(),
            is_default: true,
        },
        true,
    );
    app.store.seed_role(
        Role {
            id: "r-c".into(),
            name: "Archived".into(),
            is_default: false,
        },
        false,
    );

    for token in [super_admin_token(), system_admin_token()] {
        let resp = app
            .send(get_request("/api/v1/roles/all", Some(&token)))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Students", "Teachers"]);
        assert_eq!(body["data"][0]["isDefault"], true);
    }

    let resp = app
        .send(get_request("/api/v1/roles/all", Some(&plain_token())))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["code"], 403);
}

#[tokio::test]
async fn only_super_admin_replaces_roles() {
    let app = app();
    for (id, name) in [("r1", "Students"), ("r2", "Teachers")] {
        app.store.seed_role(
            Role {
                id: id.into(),
                name: name.into(),
                is_default: false,
            },
            true,
        );
    }
    let body = json!({"role_ids": ["r2", "r1"]});

    let resp = app
        .send(json_request("PUT", "/api/v1/users/u1/roles", None, body.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .send(json_request(
            "PUT",
            "/api/v1/users/u1/roles",
            Some(&system_admin_token()),
            body.clone(),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .send(json_request(
            "PUT",
            "/api/v1/users/u1/roles",
            Some(&super_admin_token()),
            body,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["code"], 0);

    let resp = app
        .send(get_request("/api/v1/users/u1/roles", Some(&system_admin_token())))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["r1", "r2"]);
}

#[tokio::test]
async fn duplicate_role_ids_conflict() {
    let app = app();
    let resp = app
        .send(json_request(
            "PUT",
            "/api/v1/users/u1/roles",
            Some(&super_admin_token()),
            json!({"role_ids": ["r1", "r1"]}),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
