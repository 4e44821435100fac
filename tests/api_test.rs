mod common;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use balance_ledger::{
    app,
    handlers::health::HealthResponse,
    models::{balance::BalanceResponse, transaction::TransactionResponse, transfer::TransferResponse},
};
use common::memory_service;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceExt;

fn router() -> Router {
    app::router(memory_service())
}

async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Vec<u8>)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, body.to_vec()))
}

async fn post(router: &Router, uri: &str, body: Value) -> Result<(StatusCode, Vec<u8>)> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?;
    send(router, request).await
}

async fn get(router: &Router, uri: &str) -> Result<(StatusCode, Vec<u8>)> {
    let request = Request::builder().uri(uri).body(Body::empty())?;
    send(router, request).await
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

fn error_code(body: &[u8]) -> Result<String> {
    let value: Value = parse(body)?;
    Ok(value["error"]["code"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_top_up_debit_and_read_back() -> Result<()> {
    let router = router();

    let (status, body) = post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": "100"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let balance: BalanceResponse = parse(&body)?;
    assert_eq!(balance.amount, "100.00");
    assert_eq!(balance.currency, "RUB");

    let (status, body) = post(
        &router,
        "/api/v1/balance/debit",
        json!({"account_id": 1, "amount": "40.5"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<BalanceResponse>(&body)?.amount, "59.50");

    let (status, body) = get(&router, "/api/v1/accounts/1/balance").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<BalanceResponse>(&body)?.amount, "59.50");

    let (status, body) = get(&router, "/api/v1/accounts/1/transactions?sort=amount").await?;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<TransactionResponse> = parse(&body)?;
    let amounts: Vec<_> = history.iter().map(|t| t.amount.as_str()).collect();
    assert_eq!(amounts, vec!["100.00", "-40.50"]);

    Ok(())
}

#[tokio::test]
async fn test_error_responses() -> Result<()> {
    let router = router();
    post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": "10"}),
    )
    .await?;

    let (status, body) = post(
        &router,
        "/api/v1/balance/debit",
        json!({"account_id": 1, "amount": "1000"}),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body)?, "insufficient_funds");

    let (status, body) = get(&router, "/api/v1/accounts/2/balance").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body)?, "account_not_found");

    let (status, body) = get(&router, "/api/v1/accounts/0/balance").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "invalid_account");

    let (status, body) = get(&router, "/api/v1/accounts/abc/balance").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "invalid_request");

    let (status, body) = get(&router, "/api/v1/accounts/1/transactions?sort=name").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "invalid_sort_key");

    let (status, body) = post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": "-3"}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "invalid_amount");

    let (status, body) = post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": "1000000000000000000"}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "invalid_amount");

    let (status, body) = post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": 3.5}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "invalid_request");

    let (status, body) = post(
        &router,
        "/api/v1/transfers",
        json!({"from_account_id": 1, "to_account_id": 1, "amount": "1"}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, "same_account");

    Ok(())
}

#[tokio::test]
async fn test_transfer_endpoint() -> Result<()> {
    let router = router();
    post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": "50"}),
    )
    .await?;

    let (status, body) = post(
        &router,
        "/api/v1/transfers",
        json!({"from_account_id": 1, "to_account_id": 2, "amount": "50"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let receipt: TransferResponse = parse(&body)?;
    assert_eq!(receipt.from_balance, "0.00");
    assert_eq!(receipt.to_balance, "50.00");
    assert_eq!(receipt.status, "completed");

    let (_, body) = get(&router, "/api/v1/accounts/2/transactions").await?;
    let history: Vec<TransactionResponse> = parse(&body)?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation.as_str(), "transfer_in");

    Ok(())
}

#[tokio::test]
async fn test_balance_in_other_currency() -> Result<()> {
    let router = router();
    post(
        &router,
        "/api/v1/balance/top-up",
        json!({"account_id": 1, "amount": "1000"}),
    )
    .await?;

    let (status, body) = get(&router, "/api/v1/accounts/1/balance?currency=USD").await?;
    assert_eq!(status, StatusCode::OK);
    let balance: BalanceResponse = parse(&body)?;
    assert_eq!(balance.amount, "12.50");
    assert_eq!(balance.currency, "USD");

    let (status, body) = get(&router, "/api/v1/accounts/1/balance?currency=EUR").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<BalanceResponse>(&body)?.amount, "10.00");

    let (status, body) = get(&router, "/api/v1/accounts/1/balance?currency=GBP").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body)?, "rate_unavailable");

    // The stored balance is untouched by conversions
    let (_, body) = get(&router, "/api/v1/accounts/1/balance").await?;
    assert_eq!(parse::<BalanceResponse>(&body)?.amount, "1000.00");

    Ok(())
}

#[tokio::test]
async fn test_health_and_readiness() -> Result<()> {
    let router = router();

    let (status, body) = get(&router, "/health").await?;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = parse(&body)?;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.storage, "memory: connected");

    let (status, body) = get(&router, "/readiness").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    Ok(())
}
