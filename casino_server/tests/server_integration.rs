//! Integration tests for the HTTP API.
//!
//! Every test drives the full router through `oneshot` on top of the
//! in-memory account store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use casino::db::{FailPoint, MemoryAccountStore};
use casino::wallet::BalanceReconciler;
use casino_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use casino_server::config::RouletteConfig;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const ACCOUNT: i64 = 1;

fn create_test_server(balance: i64) -> (axum::Router, MemoryAccountStore) {
    let store = MemoryAccountStore::with_accounts([(ACCOUNT, balance)]);
    let state = AppState {
        reconciler: Arc::new(BalanceReconciler::new(Arc::new(store.clone()))),
        config: Arc::new(RouletteConfig {
            max_wager: 1_000,
            history_limit: 50,
        }),
    };
    (create_router(state), store)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    match body {
        Some(body) => send_raw(app, method, uri, body.to_string()).await,
        None => {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            read(app, request).await
        }
    }
}

async fn send_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: String,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    read(app, request).await
}

async fn read(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn straight(number: i64, amount: i64) -> Value {
    json!({
        "label": number.to_string(),
        "numbers": [number],
        "betType": "straight",
        "odds": 35,
        "amount": amount
    })
}

/// `amount` on every pocket: exactly one straight wins whatever comes up.
fn every_straight(amount: i64) -> Value {
    Value::Array((0..=36).map(|number| straight(number, amount)).collect())
}

fn spin_body(wagers: Value) -> Value {
    json!({"accountId": ACCOUNT, "wagers": wagers})
}

/// Open a round and return `(roundId, number)`.
async fn spin(app: &axum::Router, wagers: Value) -> (String, i64) {
    let (status, body) = send(app, "POST", "/api/v1/roulette/spin", Some(spin_body(wagers))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["roundId"].as_str().unwrap().to_string(),
        body["number"].as_i64().unwrap(),
    )
}

fn settle_body(round_id: &str, number: i64) -> Value {
    json!({
        "accountId": ACCOUNT,
        "roundId": round_id,
        "winningNumber": number
    })
}

async fn balance(app: &axum::Router) -> i64 {
    let (status, body) = send(app, "GET", "/api/v1/accounts/1/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    body["balance"].as_i64().unwrap()
}

// ============================================================================
// Health and Board
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, _) = create_test_server(1000);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_board_is_cacheable() {
    let (app, _) = create_test_server(1000);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/roulette/board")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["cache-control"],
        "public, max-age=3600"
    );
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let board: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(board["numberBoardRows"].as_array().unwrap().len(), 12);
    assert_eq!(board["splitBets"].as_array().unwrap().len(), 57);
}

// ============================================================================
// Spin and Settle
// ============================================================================

#[tokio::test]
async fn test_spin_unknown_account() {
    let (app, _) = create_test_server(1000);

    let body = json!({"accountId": 99, "wagers": [straight(17, 10)]});
    let (status, _) = send(&app, "POST", "/api/v1/roulette/spin", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spin_debits_stake_up_front() {
    let (app, _) = create_test_server(1000);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/roulette/spin",
        Some(spin_body(every_straight(10))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["totalStake"], 370);
    assert_eq!(body["balance"], 630);
    assert_eq!(balance(&app).await, 630);
}

#[tokio::test]
async fn test_abandoned_round_keeps_stake() {
    let (app, _) = create_test_server(1000);
    let (round_id, _) = spin(&app, every_straight(1)).await;

    // Never settled: the stake is gone and the bets are on record.
    assert_eq!(balance(&app).await, 963);
    let (status, bets) = send(&app, "GET", &format!("/api/v1/rounds/{round_id}/bets"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bets.as_array().unwrap().len(), 37);
}

#[tokio::test]
async fn test_winning_round_is_credited_once() {
    let (app, _) = create_test_server(1000);
    let (round_id, number) = spin(&app, every_straight(10)).await;
    let body = settle_body(&round_id, number);

    let (status, settled) = send(&app, "POST", "/api/v1/roulette/settle", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK, "{settled}");
    assert_eq!(settled["totalWin"], 350);
    assert_eq!(settled["netPayout"], 360);
    assert_eq!(settled["totalStake"], 370);
    assert_eq!(settled["newBalance"], 990);

    let (status, again) = send(&app, "POST", "/api/v1/roulette/settle", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["retryable"], false);

    assert_eq!(balance(&app).await, 990);
}

#[tokio::test]
async fn test_wagers_sent_after_spin_are_rejected() {
    let (app, _) = create_test_server(1000);
    let (round_id, number) = spin(&app, json!([straight(0, 10)])).await;
    assert_eq!(balance(&app).await, 990);

    // Raising the stake on the number that came up is refused.
    let mut body = settle_body(&round_id, number);
    body["wagers"] = json!([straight(number, 20)]);
    let (status, error) = send(&app, "POST", "/api/v1/roulette/settle", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{error}");
    assert_eq!(balance(&app).await, 990);

    // An exact echo of the committed wagers is accepted.
    let mut body = settle_body(&round_id, number);
    body["wagers"] = json!([straight(0, 10)]);
    let (status, settled) = send(&app, "POST", "/api/v1/roulette/settle", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{settled}");
    let expected = if number == 0 { 1350 } else { 990 };
    assert_eq!(settled["newBalance"], expected);
}

#[tokio::test]
async fn test_settle_with_wrong_number_is_rejected() {
    let (app, _) = create_test_server(1000);
    let (round_id, number) = spin(&app, every_straight(10)).await;
    let other = (number + 1) % 37;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/roulette/settle",
        Some(settle_body(&round_id, other)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(balance(&app).await, 630);
}

#[tokio::test]
async fn test_store_failure_is_retryable() {
    let (app, store) = create_test_server(1000);
    let (round_id, number) = spin(&app, every_straight(10)).await;
    let body = settle_body(&round_id, number);

    store.fail_at(FailPoint::Update);
    let (status, error) = send(&app, "POST", "/api/v1/roulette/settle", Some(body.clone())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["retryable"], true);
    store.clear_fail_point();

    assert_eq!(balance(&app).await, 630);

    let (status, settled) = send(&app, "POST", "/api/v1/roulette/settle", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["newBalance"], 990);
}

#[tokio::test]
async fn test_invalid_wagers_are_rejected_at_spin() {
    let (app, _) = create_test_server(1000);

    let cases = [
        // Not an array
        json!({"label": "17"}),
        // Nothing to play
        json!([]),
        // Not on the board: 1 and 5 are not adjacent
        json!([{"label": "1/5", "numbers": [1, 5], "betType": "split", "odds": 17, "amount": 10}]),
        // Odds mismatch
        json!([{"label": "17", "numbers": [17], "betType": "straight", "odds": 36, "amount": 10}]),
        // Non-positive amount
        json!([straight(17, 0)]),
        // Above the configured maximum
        json!([straight(17, 1_001)]),
        // Above the maximum once repeated entries are merged
        json!([straight(17, 600), straight(17, 600)]),
        // Off the wheel
        json!([straight(37, 10)]),
    ];

    for wagers in cases {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/roulette/spin",
            Some(spin_body(wagers.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{wagers} -> {body}");
        assert_eq!(body["retryable"], false);
    }

    assert_eq!(balance(&app).await, 1000);
}

#[tokio::test]
async fn test_malformed_json_gets_error_body() {
    let (app, _) = create_test_server(1000);

    for uri in ["/api/v1/roulette/spin", "/api/v1/accounts/1/balance"] {
        let (status, body) = send_raw(&app, "POST", uri, "{\"accountId\":".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().starts_with("Validation error"), "{uri}");
        assert_eq!(body["retryable"], false, "{uri}");
    }
}

#[tokio::test]
async fn test_claimed_balance_is_advisory() {
    let (app, _) = create_test_server(1000);
    let (round_id, number) = spin(&app, every_straight(10)).await;

    let mut body = settle_body(&round_id, number);
    body["claimedBalance"] = json!(1.5);
    let (status, _) = send(&app, "POST", "/api/v1/roulette/settle", Some(body.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A wrong but well-formed claim does not change the outcome.
    body["claimedBalance"] = json!(999_999);
    let (status, settled) = send(&app, "POST", "/api/v1/roulette/settle", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["newBalance"], 990);
}

#[tokio::test]
async fn test_stake_above_balance_is_rejected() {
    let (app, _) = create_test_server(5);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/roulette/spin",
        Some(spin_body(json!([straight(17, 10)]))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(balance(&app).await, 5);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_apply_delta() {
    let (app, _) = create_test_server(1000);
    let uri = "/api/v1/accounts/1/balance";

    let (status, body) = send(&app, "POST", uri, Some(json!({"delta": 250}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 1250);

    let (status, _) = send(&app, "POST", uri, Some(json!({"delta": -2000}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(balance(&app).await, 1250);

    let (status, _) = send(&app, "GET", "/api/v1/accounts/42/balance", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_and_stats() {
    let (app, _) = create_test_server(1000);

    let mut wagers = every_straight(1);
    wagers.as_array_mut().unwrap().push(json!({
        "label": "1 to 12",
        "numbers": (1..=12).collect::<Vec<i64>>(),
        "betType": "dozen",
        "odds": 2,
        "amount": 5
    }));
    let (round_id, number) = spin(&app, wagers).await;

    let (status, settled) = send(
        &app,
        "POST",
        "/api/v1/roulette/settle",
        Some(settle_body(&round_id, number)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, history) = send(&app, "GET", "/api/v1/accounts/1/bets?limit=100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 38);

    let (status, bets) = send(&app, "GET", &format!("/api/v1/rounds/{round_id}/bets"), None).await;
    assert_eq!(status, StatusCode::OK);
    let bets = bets.as_array().unwrap();
    assert_eq!(bets.len(), 38);
    let winners = bets.iter().filter(|bet| bet["won"] == true).count();
    assert_eq!(winners, if (1..=12).contains(&number) { 2 } else { 1 });

    // Won only when the dozen comes in on top of the straight.
    let won = settled["netPayout"].as_i64().unwrap() > settled["totalStake"].as_i64().unwrap();
    let (status, stats) = send(&app, "GET", "/api/v1/accounts/1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats[0]["gamesPlayed"], 1);
    assert_eq!(stats[0]["gamesWon"], i64::from(won));

    let (status, _) = send(&app, "GET", "/api/v1/accounts/1/bets?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
