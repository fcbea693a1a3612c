//! API Integration Tests
//!
//! Full router (auth + logging middleware) over the in-memory store.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::util::ServiceExt;

mod common;

use common::TEST_API_KEY;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create(app: &Router, name: &str, balance: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/accounts",
        Some(json!({
            "name": name,
            "email": format!("{}@kbtu.kz", name.to_lowercase()),
            "balance": balance,
        })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "creating {name} failed: {body}");
    body["id"].as_i64().unwrap()
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn balance(app: &Router, id: i64) -> Decimal {
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/v1/accounts/{id}"),
        None,
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    decimal(&body["balance"])
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let (_store, app) = common::memory_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_and_invalid_api_key() {
    let (_store, app) = common::memory_app();

    let (status, body) = send(&app, "GET", "/api/v1/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "missing_api_key");

    let (status, body) = send(&app, "GET", "/api/v1/accounts", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_api_key");
}

#[tokio::test]
async fn test_transfer_e2e() {
    let (store, app) = common::memory_app();

    let arman = create(&app, "Arman", "1000.00").await;
    let anara = create(&app, "Anara", "500.00").await;

    // 1. Successful transfer
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transfers",
        Some(json!({ "from_id": arman, "to_id": anara, "amount": "200" })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "transfer failed: {body}");
    assert_eq!(body["status"], "completed");
    assert_eq!(decimal(&body["from_balance"]), dec!(800));
    assert_eq!(decimal(&body["to_balance"]), dec!(700));

    // 2. Insufficient funds leaves both balances alone
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transfers",
        Some(json!({ "from_id": arman, "to_id": anara, "amount": "10000" })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "insufficient_funds");

    assert_eq!(balance(&app, arman).await, dec!(800));
    assert_eq!(balance(&app, anara).await, dec!(700));
    assert_eq!(store.total_balance().await, dec!(1500));
}

#[tokio::test]
async fn test_list_accounts_in_id_order() {
    let (_store, app) = common::memory_app();
    let first = create(&app, "Arman", "1000").await;
    let second = create(&app, "Anara", "0").await;

    let (status, body) = send(&app, "GET", "/api/v1/accounts", None, Some(TEST_API_KEY)).await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<i64> = body["accounts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_unknown_account_is_404() {
    let (_store, app) = common::memory_app();
    let arman = create(&app, "Arman", "1000").await;

    let (status, body) = send(&app, "GET", "/api/v1/accounts/999", None, Some(TEST_API_KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "account_not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transfers",
        Some(json!({ "from_id": arman, "to_id": 999, "amount": "10" })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "receiver 999");
    assert_eq!(balance(&app, arman).await, dec!(1000));
}

#[tokio::test]
async fn test_duplicate_email_is_409() {
    let (_store, app) = common::memory_app();
    create(&app, "Arman", "1000").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/accounts",
        Some(json!({ "name": "Arman Two", "email": "ARMAN@kbtu.kz", "balance": "5" })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "duplicate_email");
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let (_store, app) = common::memory_app();
    let arman = create(&app, "Arman", "1000").await;

    let cases = [
        (json!({ "from_id": arman, "to_id": arman, "amount": "10" }), "same_account_transfer"),
        (json!({ "from_id": arman, "to_id": 2, "amount": "0" }), "invalid_amount"),
        (json!({ "from_id": arman, "to_id": 2, "amount": "-5" }), "invalid_amount"),
        (json!({ "from_id": arman, "to_id": 2, "amount": "ten" }), "invalid_amount"),
        (
            json!({ "from_id": arman, "to_id": 2, "amount": "1", "timeout_ms": 0 }),
            "invalid_request",
        ),
    ];

    for (request, code) in cases {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/transfers",
            Some(request.clone()),
            Some(TEST_API_KEY),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{request}");
        assert_eq!(body["error_code"], code, "{request}");
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/accounts",
        Some(json!({ "name": "Bad", "email": "not-an-email", "balance": "1" })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_email");

    assert_eq!(balance(&app, arman).await, dec!(1000));
}

#[tokio::test]
async fn test_non_numeric_account_id_is_400() {
    let (_store, app) = common::memory_app();

    let (status, body) = send(&app, "GET", "/api/v1/accounts/abc", None, Some(TEST_API_KEY)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (_store, app) = common::memory_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/transfers")
                .header("content-type", "application/json")
                .header("X-API-Key", TEST_API_KEY)
                .body(Body::from("{\"from_id\": 1,"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let (_store, app) = common::memory_app();
    let correlation_id = "5f0c2a3e-8d4b-4c1e-9a7f-2b6d8e1c3f90";

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/accounts")
                .header("X-API-Key", TEST_API_KEY)
                .header("X-Correlation-Id", correlation_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-correlation-id"], correlation_id);

    // Without one, a fresh id is assigned
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/accounts")
                .header("X-API-Key", TEST_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let assigned = response.headers()["x-correlation-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(assigned).is_ok());
}

#[tokio::test]
async fn test_credit_past_max_balance_is_400() {
    let (store, app) = common::memory_app();
    let arman = create(&app, "Arman", "1000").await;
    let full = create(&app, "Full", "1000000000000").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transfers",
        Some(json!({ "from_id": arman, "to_id": full, "amount": "500" })),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "balance_limit_exceeded");

    assert_eq!(balance(&app, arman).await, dec!(1000));
    assert_eq!(balance(&app, full).await, dec!(1000000000000));
    assert_eq!(store.total_balance().await, dec!(1000000001000));
}
