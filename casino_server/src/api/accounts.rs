//! Account endpoints: balances, bet history and daily stats.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Json,
};
use casino::wallet::{AccountBalance, AccountId, BetRecord, DailyStats};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState, bad_request, request_id::RequestId, wallet_error};

/// Balance adjustment request
#[derive(Debug, Deserialize)]
pub struct DeltaRequest {
    /// Signed amount; positive credits, negative debits
    pub delta: i64,
}

/// Paging for history endpoints
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Get the stored balance of an account.
///
/// # Path Parameters
///
/// - `account_id`: Account identifier
///
/// # Errors
///
/// - `404 Not Found`: Unknown account
pub async fn get_balance(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
) -> Result<Json<AccountBalance>, ApiError> {
    state
        .reconciler
        .balance(account_id)
        .await
        .map(Json)
        .map_err(|e| wallet_error(request_id.as_str(), "balance", e))
}

/// Credit or debit an account.
///
/// # Request Body
///
/// ```json
/// { "delta": -250 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, debit larger than the balance, or
///   overflow
/// - `404 Not Found`: Unknown account
/// - `503 Service Unavailable`: Store failure, nothing was applied
pub async fn apply_delta(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
    payload: Result<Json<DeltaRequest>, JsonRejection>,
) -> Result<Json<AccountBalance>, ApiError> {
    let Json(request) =
        payload.map_err(|e| bad_request(format!("Validation error: {}", e.body_text())))?;
    let balance = state
        .reconciler
        .apply_delta(account_id, request.delta)
        .await
        .map_err(|e| wallet_error(request_id.as_str(), "apply_delta", e))?;

    Ok(Json(AccountBalance {
        account_id,
        balance,
    }))
}

/// Most recent bets of an account, newest first.
///
/// # Query Parameters
///
/// - `limit`: Page size, defaults to the configured history limit
pub async fn bet_history(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<BetRecord>>, ApiError> {
    let limit = query.limit.unwrap_or(state.config.history_limit);
    state
        .reconciler
        .bet_history(account_id, limit)
        .await
        .map(Json)
        .map_err(|e| wallet_error(request_id.as_str(), "bet_history", e))
}

/// Daily games played and won, newest day first.
pub async fn daily_stats(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DailyStats>>, ApiError> {
    let limit = query.limit.unwrap_or(state.config.history_limit);
    state
        .reconciler
        .daily_stats(account_id, limit)
        .await
        .map(Json)
        .map_err(|e| wallet_error(request_id.as_str(), "daily_stats", e))
}

/// Bets placed in one round. Empty until the round is settled.
pub async fn round_bets(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(round_id): Path<Uuid>,
) -> Result<Json<Vec<BetRecord>>, ApiError> {
    state
        .reconciler
        .round_bets(round_id)
        .await
        .map(Json)
        .map_err(|e| wallet_error(request_id.as_str(), "round_bets", e))
}
