//! Integration tests for the HTTP surface.
//!
//! Drives the full router (auth middleware, handlers, service) against the
//! in-memory store and simulated gateways.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use paygate_hex::inbound::{GatewayCredentials, HttpServer};
use paygate_hex::{
    DirectorySelector, EventPublisher, GatewayRegistry, PaymentService, PublisherConfig,
};
use paygate_repo::{
    ApproveAllCompliance, FixedBalance, LogEventBus, MemoryDirectory, MemoryStore,
    SimulatedGateway,
};
use paygate_types::{CountryId, GatewayDescriptor, GatewayId, TransactionId, TransactionStatus};

const GATEWAY_KEY: &str = "gw_stripe_test_key";

/// Helper to build the router over a fresh in-memory store.
fn create_test_app() -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let directory = MemoryDirectory::new()
        .with_gateway(CountryId::new(840), GatewayDescriptor::new(112, "stripe"))
        .with_gateway(CountryId::new(840), GatewayDescriptor::new(200, "paypal"));
    let registry = GatewayRegistry::new(Arc::new(SimulatedGateway::stripe()))
        .register(Arc::new(SimulatedGateway::paypal()));
    let (publisher, _workers) =
        EventPublisher::start(Arc::new(LogEventBus), PublisherConfig::default());

    let service = PaymentService::new(
        store.clone(),
        Arc::new(ApproveAllCompliance),
        Arc::new(FixedBalance::new(dec!(5454.00))),
        Arc::new(DirectorySelector::new(Arc::new(directory), registry)),
        publisher,
    );
    let credentials = GatewayCredentials::new().with_key(GatewayId::new(112), GATEWAY_KEY);

    (HttpServer::new(service, credentials).router(), store)
}

fn transaction_request(path: &str, user_id: Option<&str>, key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("Content-Type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("X-User-Id", user_id);
    }
    if let Some(key) = key {
        builder = builder.header("Idempotency-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn callback_request(api_key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/payment-callback")
        .header("Content-Type", "application/json");
    if let Some(api_key) = api_key {
        builder = builder.header("X-Gateway-Api-Key", api_key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

const VALID_BODY: &str = r#"{"amount": 100.50, "currency": "USD", "gateway_id": 112, "country_id": 840}"#;

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["event_bus"], "closed");
}

#[tokio::test]
async fn test_deposit_creates_pending_transaction() {
    let (app, store) = create_test_app();

    let response = app
        .oneshot(transaction_request("/deposit", Some("33322"), Some("idem-1"), VALID_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status_code"], 200);
    assert_eq!(json["message"], "Deposit initiated");

    let id = json["data"]["transaction_id"].as_i64().unwrap();
    let tx = store.get(TransactionId::new(id)).unwrap();
    assert_eq!(tx.status, Some(TransactionStatus::Pending));
    assert_eq!(tx.amount, dec!(100.50));
    assert_eq!(tx.idempotency_key.as_deref(), Some("idem-1"));
    assert!(tx.gateway_txn_id.unwrap().starts_with("stripe_txn_"));
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(transaction_request("/withdraw", None, Some("idem-1"), VALID_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["status_code"], 401);
}

#[tokio::test]
async fn test_missing_idempotency_key() {
    let (app, store) = create_test_app();

    let response = app
        .oneshot(transaction_request("/deposit", Some("33322"), None, VALID_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Idempotency-Key header is required"
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unparseable_body() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(transaction_request("/deposit", Some("33322"), Some("k"), "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Could not parse data");
}

#[tokio::test]
async fn test_invalid_currency() {
    let (app, _) = create_test_app();
    let body = r#"{"amount": 10, "currency": "USDT", "gateway_id": 112, "country_id": 840}"#;

    let response = app
        .oneshot(transaction_request("/deposit", Some("33322"), Some("k"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid currency code");
}

#[tokio::test]
async fn test_withdraw_over_balance() {
    let (app, store) = create_test_app();
    let body = r#"{"amount": 10000, "currency": "USD", "gateway_id": 112, "country_id": 840}"#;

    let response = app
        .oneshot(transaction_request("/withdraw", Some("33322"), Some("k"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"], "Insufficient funds.");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_callback_requires_gateway_key() {
    let (app, _) = create_test_app();
    let body = r#"{"gateway_txn_id": "stripe_txn_1", "status": "completed"}"#;

    let response = app.clone().oneshot(callback_request(None, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(callback_request(Some("wrong"), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_unknown_transaction() {
    let (app, _) = create_test_app();
    let body = r#"{"gateway_txn_id": "stripe_txn_missing", "status": "completed"}"#;

    let response = app
        .oneshot(callback_request(Some(GATEWAY_KEY), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Transaction not found");
}

#[tokio::test]
async fn test_callback_malformed_body() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(callback_request(Some(GATEWAY_KEY), r#"{"status": "completed"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid data. It should include transaction ID and status"
    );
}

#[tokio::test]
async fn test_withdraw_then_complete_then_reject_flip() {
    let (app, store) = create_test_app();

    let response = app
        .clone()
        .oneshot(transaction_request("/withdraw", Some("33322"), Some("idem-2"), VALID_BODY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = json_body(response).await["data"]["transaction_id"]
        .as_i64()
        .unwrap();
    let gateway_txn_id = store
        .get(TransactionId::new(id))
        .and_then(|tx| tx.gateway_txn_id)
        .unwrap();

    let completed = format!(r#"{{"gateway_txn_id": "{gateway_txn_id}", "status": "completed"}}"#);
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(callback_request(Some(GATEWAY_KEY), &completed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "Callback processed successfully"
        );
    }
    assert_eq!(
        store.get(TransactionId::new(id)).unwrap().status,
        Some(TransactionStatus::Completed)
    );

    let failed = format!(
        r#"{{"gateway_txn_id": "{gateway_txn_id}", "status": "failed", "error_message": "late decline"}}"#
    );
    let response = app
        .oneshot(callback_request(Some(GATEWAY_KEY), &failed))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        store.get(TransactionId::new(id)).unwrap().status,
        Some(TransactionStatus::Completed)
    );
}
