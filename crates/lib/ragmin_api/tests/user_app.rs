//! Session-guarded user application routes.

mod common;

use axum::http::StatusCode;
use ragmin_core::auth::password::{encode_password, verify_password};
use ragmin_core::sso::CasConfig;
use serde_json::json;

use common::{TestApp, account, body_json, get_request, json_request, spawn_fake_cas};

const TOKEN: &str = "u1-token";

fn app_with_user() -> TestApp {
    let app = TestApp::new(CasConfig::default());
    app.store
        .seed_account(account("u1", "u1@zime.edu.cn", "pw", false));
    app
}

#[tokio::test]
async fn missing_or_unknown_session_is_401() {
    let app = app_with_user();
    let resp = app.send(get_request("/v1/user/info", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.send(get_request("/v1/user/info", Some("nope"))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_account_has_no_session() {
    let app = TestApp::new(CasConfig::default());
    let mut disabled = account("u1", "u1@zime.edu.cn", "pw", false);
    disabled.status = Some("0".into());
    app.store.seed_account(disabled);

    let resp = app.send(get_request("/v1/user/info", Some(TOKEN))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_writes_nothing() {
    let app = app_with_user();
    let before = app.store.account("u1").unwrap();

    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/setting",
            Some(TOKEN),
            json!({
                "password": encode_password("not-pw"),
                "new_password": encode_password("new-pw"),
                "nickname": "Mallory",
            }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["code"], 109);
    assert_eq!(body["message"], "Password error!");

    let after = app.store.account("u1").unwrap();
    assert_eq!(after.password, before.password);
    assert_eq!(after.nickname, before.nickname);
}

#[tokio::test]
async fn password_change_rehashes() {
    let app = app_with_user();
    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/setting",
            Some(TOKEN),
            json!({"password": encode_password("pw"), "new_password": encode_password("pw2")}),
        ))
        .await;
    assert_eq!(body_json(resp).await["code"], 0);

    let hash = app.store.account("u1").unwrap().password.unwrap();
    assert!(verify_password(&encode_password("pw2"), &hash).unwrap());
    assert!(!verify_password(&encode_password("pw"), &hash).unwrap());
}

#[tokio::test]
async fn protected_fields_are_never_applied() {
    let app = app_with_user();
    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/setting",
            Some(TOKEN),
            json!({
                "nickname": "Al",
                "language": "Chinese",
                "email": "root@zime.edu.cn",
                "status": "0",
                "is_superuser": true,
                "login_channel": "password",
            }),
        ))
        .await;
    assert_eq!(body_json(resp).await["code"], 0);

    let after = app.store.account("u1").unwrap();
    assert_eq!(after.nickname, "Al");
    assert_eq!(after.language.as_deref(), Some("Chinese"));
    assert_eq!(after.email, "u1@zime.edu.cn");
    assert_eq!(after.status.as_deref(), Some("1"));
    assert!(!after.is_superuser);
}

#[tokio::test]
async fn unknown_setting_is_an_argument_error() {
    let app = app_with_user();
    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/setting",
            Some(TOKEN),
            json!({"is_system_admin": true}),
        ))
        .await;
    let body = body_json(resp).await;
    assert_eq!(body["code"], 101);
    assert!(!app.store.account("u1").unwrap().is_system_admin);
}

#[tokio::test]
async fn tenant_settings_round_trip_for_sso_accounts() {
    let app = TestApp::new(spawn_fake_cas().await);
    let resp = app
        .send(get_request("/v1/user/cas_callback?code=good", None))
        .await;
    let token = common::location(&resp)
        .strip_prefix("/?auth=")
        .unwrap()
        .to_string();

    let body = body_json(app.send(get_request("/v1/user/tenant_info", Some(&token))).await).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["name"], "Alice's Kingdom");
    assert_eq!(body["data"]["llm_id"], "qwen-plus@Tongyi-Qianwen");
    assert_eq!(body["data"]["role"], "owner");
    let tenant_id = body["data"]["tenant_id"].as_str().unwrap().to_string();

    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/set_tenant_info",
            Some(&token),
            json!({
                "tenant_id": tenant_id,
                "llm_id": "deepseek-chat@DeepSeek",
                "embd_id": "bge-m3@BAAI",
                "asr_id": "",
                "img2txt_id": "",
            }),
        ))
        .await;
    assert_eq!(body_json(resp).await["code"], 0);

    let body = body_json(app.send(get_request("/v1/user/tenant_info", Some(&token))).await).await;
    assert_eq!(body["data"]["llm_id"], "deepseek-chat@DeepSeek");
    assert_eq!(body["data"]["embd_id"], "bge-m3@BAAI");
}

#[tokio::test]
async fn set_tenant_info_requires_fields_and_membership() {
    let app = app_with_user();

    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/set_tenant_info",
            Some(TOKEN),
            json!({"tenant_id": "t1", "llm_id": "x"}),
        ))
        .await;
    let body = body_json(resp).await;
    assert_eq!(body["code"], 101);
    assert_eq!(
        body["message"],
        "required argument are missing: asr_id,embd_id,img2txt_id"
    );

    let resp = app
        .send(json_request(
            "POST",
            "/v1/user/set_tenant_info",
            Some(TOKEN),
            json!({
                "tenant_id": "someone-else",
                "llm_id": "x",
                "embd_id": "x",
                "asr_id": "x",
                "img2txt_id": "x",
            }),
        ))
        .await;
    let body = body_json(resp).await;
    assert_eq!(body["code"], 109);
}

#[tokio::test]
async fn tenant_info_without_tenant_is_a_data_error() {
    let app = app_with_user();
    let body = body_json(app.send(get_request("/v1/user/tenant_info", Some(TOKEN))).await).await;
    assert_eq!(body["code"], 102);
}
