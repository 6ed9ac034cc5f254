mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;

use common::{body_json, TestApp};

fn put_balance(user_id: &str, encrypted_balance: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/users/{}/balance", user_id))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "encrypted_balance": encrypted_balance }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_store_status() {
    let app = TestApp::new();

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["db"], "connected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_register_and_fetch_login_meta() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/users",
            json!({
                "login": "jan",
                "email": "jan@example.pl",
                "salt": "c2FsdA==",
                "password_hash": "argon2id$v=19$abc",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["login"], "jan");
    assert!(created.get("salt").is_none());

    let response = app.get("/logins/jan/meta").await;
    assert_eq!(response.status(), StatusCode::OK);
    let meta = body_json(response).await;
    assert_eq!(meta["user_id"], created["user_id"]);
    assert_eq!(meta["salt"], "c2FsdA==");
    assert_eq!(meta["password_hash"], "argon2id$v=19$abc");
}

#[tokio::test]
async fn test_duplicate_login_conflicts() {
    let app = TestApp::new();
    app.register("ola").await;

    let response = app
        .post_json(
            "/users",
            json!({
                "login": "ola",
                "email": "other@example.pl",
                "salt": "s",
                "password_hash": "h",
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::new();

    let cases = [
        json!({ "login": "", "email": "a@b.pl", "salt": "s", "password_hash": "h" }),
        json!({ "login": "a", "email": "not-an-email", "salt": "s", "password_hash": "h" }),
        json!({ "login": "a", "email": "a@b.pl", "salt": "", "password_hash": "h" }),
        json!({ "login": "a", "email": "a@b.pl", "salt": "s", "password_hash": " " }),
    ];

    for case in cases {
        let response = app.post_json("/users", case).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_unknown_login_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/logins/nobody/meta").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_balance_round_trip() {
    let app = TestApp::new();
    let user_id = app.register("piotr").await;

    let response = app.get(&format!("/users/{}/balance", user_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["encrypted_balance"], "");

    let response = app.send(put_balance(&user_id, "Y2lwaGVydGV4dA==")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/users/{}/balance", user_id)).await;
    assert_eq!(
        body_json(response).await["encrypted_balance"],
        "Y2lwaGVydGV4dA=="
    );
}

#[tokio::test]
async fn test_balance_update_validation() {
    let app = TestApp::new();
    let user_id = app.register("kasia").await;

    let response = app.send(put_balance(&user_id, "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(put_balance(&user_id, "%%% not base64 %%%")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(put_balance("ghost", "Y2lwaGVy")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
