mod common;

use chrono::Utc;
use pocket_wallet_core::gateway::signature::sign;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{succeeded_event, TestApp, WEBHOOK_SECRET};

async fn setup_test_app() -> String {
    let app = TestApp::new();

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 0));
    let server = axum::Server::bind(&addr).serve(app.router.into_make_service());
    let actual_addr = server.local_addr();

    tokio::spawn(async move {
        server.await.unwrap();
    });

    format!("http://{}", actual_addr)
}

#[tokio::test]
async fn test_full_top_up_flow() {
    let base_url = setup_test_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/users", base_url))
        .json(&json!({
            "login": "anna",
            "email": "anna@example.pl",
            "salt": "c2FsdA==",
            "password_hash": "argon2id$stub",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user_id = res.json::<Value>().await.unwrap()["user_id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!("{}/payments/intents", base_url))
        .json(&json!({ "user_id": user_id, "amount": 2500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let payment_id = res.json::<Value>().await.unwrap()["payment_id"]
        .as_str()
        .unwrap()
        .to_string();

    let payload = succeeded_event(&payment_id, &user_id, 2500);
    let res = client
        .post(format!("{}/stripe/webhook", base_url))
        .header("Stripe-Signature", sign(WEBHOOK_SECRET, Utc::now().timestamp(), &payload))
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let history: Value = client
        .get(format!("{}/users/{}/transactions", base_url, user_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["total"], 1);
    assert_eq!(history["transactions"][0]["status"], "completed");
    assert_eq!(history["transactions"][0]["amount"], "25.00");
}

#[tokio::test]
async fn test_invalid_signature_over_http() {
    let base_url = setup_test_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/stripe/webhook", base_url))
        .header("Stripe-Signature", "t=1700000000,v1=abcdef")
        .body(r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 400);
}
