use mockito::Matcher;
use pocket_wallet_core::gateway::{
    signature::sign, GatewayError, PaymentGateway, SignatureError, StripeClient, StripeSettings,
};
use std::time::Duration;

const SECRET_KEY: &str = "sk_test_4eC39HqLyjWDarjtT1zdp7dc";

fn settings(api_base: &str, timeout: Duration) -> StripeSettings {
    StripeSettings {
        api_base: api_base.to_string(),
        secret_key: SECRET_KEY.to_string(),
        publishable_key: "pk_test_TYooMQauvdEDq54NiTphI7jx".to_string(),
        webhook_secret: "whsec_client_test".to_string(),
        timeout,
        webhook_tolerance: Duration::from_secs(300),
    }
}

#[tokio::test]
async fn test_create_intent_posts_form_and_parses_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/payment_intents")
        .match_header("authorization", format!("Bearer {}", SECRET_KEY).as_str())
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("amount".into(), "5000".into()),
            Matcher::UrlEncoded("currency".into(), "pln".into()),
            Matcher::UrlEncoded("metadata[user_id]".into(), "user-42".into()),
            Matcher::UrlEncoded("automatic_payment_methods[enabled]".into(), "true".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": "pi_3MtwBwLkdIwHu7ix28a3tqPa",
                "object": "payment_intent",
                "amount": 5000,
                "currency": "pln",
                "client_secret": "pi_3MtwBwLkdIwHu7ix28a3tqPa_secret_YrKJUKribcBjcG8HVhfZluoGH",
                "status": "requires_payment_method"
            }"#,
        )
        .create_async()
        .await;

    let client = StripeClient::new(
        settings(&server.url(), Duration::from_secs(5)),
        "PLN".to_string(),
    )
    .unwrap();
    let intent = client.create_intent("user-42", 5000).await.unwrap();

    mock.assert_async().await;
    assert_eq!(intent.payment_id, "pi_3MtwBwLkdIwHu7ix28a3tqPa");
    assert!(intent.client_secret.contains("_secret_"));
}

#[tokio::test]
async fn test_api_rejection_is_surfaced_with_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/payment_intents")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":{"type":"invalid_request_error","message":"Amount must be at least 2.00 zł"}}"#,
        )
        .create_async()
        .await;

    let client = StripeClient::new(
        settings(&server.url(), Duration::from_secs(5)),
        "PLN".to_string(),
    )
    .unwrap();

    match client.create_intent("user-42", 1).await {
        Err(GatewayError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("at least 2.00"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_client_secret_is_invalid_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/payment_intents")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"pi_no_secret","object":"payment_intent"}"#)
        .create_async()
        .await;

    let client = StripeClient::new(
        settings(&server.url(), Duration::from_secs(5)),
        "PLN".to_string(),
    )
    .unwrap();

    assert!(matches!(
        client.create_intent("user-42", 100).await,
        Err(GatewayError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_unresponsive_processor_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = StripeClient::new(
        settings(&format!("http://{}", addr), Duration::from_secs(1)),
        "PLN".to_string(),
    )
    .unwrap();

    assert!(matches!(
        client.create_intent("user-42", 100).await,
        Err(GatewayError::Timeout)
    ));
}

#[tokio::test]
async fn test_circuit_breaker_opens_after_server_errors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/payment_intents")
        .with_status(503)
        .with_body("upstream unavailable")
        .expect(2)
        .create_async()
        .await;

    let client = StripeClient::with_circuit_breaker(
        settings(&server.url(), Duration::from_secs(5)),
        "PLN".to_string(),
        2,
        60,
    )
    .unwrap();
    assert_eq!(client.circuit_state(), "closed");

    for _ in 0..2 {
        assert!(matches!(
            client.create_intent("user-42", 100).await,
            Err(GatewayError::Api { status: 503, .. })
        ));
    }

    assert_eq!(client.circuit_state(), "open");
    assert!(matches!(
        client.create_intent("user-42", 100).await,
        Err(GatewayError::CircuitOpen(_))
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_do_not_trip_the_breaker() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/payment_intents")
        .with_status(402)
        .with_body(r#"{"error":{"type":"card_error","message":"declined"}}"#)
        .create_async()
        .await;

    let client = StripeClient::with_circuit_breaker(
        settings(&server.url(), Duration::from_secs(5)),
        "PLN".to_string(),
        2,
        60,
    )
    .unwrap();

    for _ in 0..3 {
        assert!(matches!(
            client.create_intent("user-42", 100).await,
            Err(GatewayError::Api { status: 402, .. })
        ));
    }
    assert_eq!(client.circuit_state(), "closed");
}

#[test]
fn test_client_verifies_webhook_signatures_with_its_secret() {
    let client = StripeClient::new(
        settings("https://api.stripe.com", Duration::from_secs(5)),
        "PLN".to_string(),
    )
    .unwrap();
    let payload = br#"{"id":"evt_1","type":"charge.refunded","data":{"object":{}}}"#;
    let now = chrono::Utc::now().timestamp();

    let good = sign("whsec_client_test", now, payload);
    assert!(client.verify_signature(payload, &good).is_ok());

    let bad = sign("whsec_wrong", now, payload);
    assert_eq!(
        client.verify_signature(payload, &bad),
        Err(SignatureError::Mismatch)
    );
}
