//! Roulette endpoints: board catalog, spin and settlement.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Json},
};
use casino::{
    roulette::{
        BetLedger, BetType, CellKey, board,
        wheel::{Color, color_of},
    },
    wallet::{AccountId, WalletError},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, AppState, bad_request, request_id::RequestId, wallet_error};
use crate::{config::RouletteConfig, logging, metrics};

/// Spin request: the wagers are committed before the wheel is spun
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    pub account_id: AccountId,
    pub wagers: Vec<WagerRequest>,
}

/// Spin response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub round_id: Uuid,
    pub number: u8,
    pub color: Color,
    pub total_stake: i64,
    /// Balance after the stake was debited
    pub balance: i64,
}

/// One wager as sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerRequest {
    /// Display only; the board's own label is used
    #[serde(default)]
    pub label: String,
    pub numbers: Vec<u8>,
    pub bet_type: BetType,
    pub odds: u32,
    pub amount: i64,
}

/// Settle request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub account_id: AccountId,
    pub round_id: Uuid,
    pub winning_number: i64,
    /// Optional echo of the wagers sent with the spin; must match them
    #[serde(default)]
    pub wagers: Option<Vec<WagerRequest>>,
    /// Balance the client believes the account holds; advisory only
    #[serde(default)]
    pub claimed_balance: Option<serde_json::Value>,
}

/// Settle response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub round_id: Uuid,
    pub winning_number: u8,
    pub total_win: i64,
    pub net_payout: i64,
    pub new_balance: i64,
    pub total_stake: i64,
}

/// Get the board document.
///
/// The board never changes while the process runs, so clients may cache it.
///
/// # Response
///
/// Returns `200 OK` with the board grouped as drawn on the table
/// (`outsideBets`, `numberBoardRows`, `zeroCell`, ...).
pub async fn get_board() -> impl IntoResponse {
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        )],
        Json(board()),
    )
}

/// Commit the wagers, debit their stake and spin the wheel.
///
/// # Request Body
///
/// ```json
/// {
///   "accountId": 1,
///   "wagers": [{"label": "17", "numbers": [17], "betType": "straight", "odds": 35, "amount": 10}]
/// }
/// ```
///
/// # Response
///
/// Returns `200 OK` with `{roundId, number, color, totalStake, balance}`. The
/// stake stays debited whether or not the round is ever settled.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, no wagers, cell not on the board,
///   odds mismatch, amount out of range, insufficient balance
/// - `404 Not Found`: Unknown account
/// - `503 Service Unavailable`: Store failure, nothing was debited
pub async fn spin(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<SpinRequest>, JsonRejection>,
) -> Result<Json<SpinResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| bad_request(format!("Validation error: {}", e.body_text())))?;
    let request_id = request_id.as_str();

    let ledger = build_ledger(&request.wagers, &state.config)
        .map_err(|e| wallet_error(request_id, "spin", e))?;

    let mut rng = StdRng::from_os_rng();
    let opened = state
        .reconciler
        .open_round(request.account_id, &ledger, &mut rng)
        .await
        .map_err(|e| wallet_error(request_id, "spin", e))?;
    let round = opened.round;

    metrics::rounds_opened_total();
    tracing::info!(
        request_id = %request_id,
        account_id = request.account_id,
        round_id = %round.round_id,
        total_stake = round.total_stake,
        "Round opened"
    );

    Ok(Json(SpinResponse {
        round_id: round.round_id,
        number: round.winning_number,
        color: color_of(round.winning_number),
        total_stake: round.total_stake,
        balance: opened.balance,
    }))
}

/// Settle a round against the stored balance.
///
/// Pays out the wagers committed by the spin, at most once per round.
///
/// # Request Body
///
/// ```json
/// {
///   "accountId": 1,
///   "roundId": "…",
///   "winningNumber": 17,
///   "claimedBalance": 990
/// }
/// ```
///
/// `wagers` may be sent as well, in the spin's format; they are only
/// compared with the committed ones.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, wrong winning number, wagers that
///   differ from the committed ones
/// - `404 Not Found`: Unknown account or round
/// - `409 Conflict`: Round already settled
/// - `503 Service Unavailable`: Store failure; the round is still pending
pub async fn settle(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<SettleRequest>, JsonRejection>,
) -> Result<Json<SettleResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| bad_request(format!("Validation error: {}", e.body_text())))?;
    let request_id = request_id.as_str();
    let fail = |e: WalletError| {
        metrics::settlements_total("error");
        wallet_error(request_id, "settle", e)
    };

    let expected = request
        .wagers
        .as_deref()
        .map(|wagers| build_ledger(wagers, &state.config))
        .transpose()
        .map_err(fail)?;

    if let Some(claimed) = &request.claimed_balance {
        let claimed = claimed_amount(claimed).map_err(fail)?;
        let stored = state
            .reconciler
            .balance(request.account_id)
            .await
            .map_err(fail)?;
        logging::log_balance_drift(request_id, request.account_id, claimed, stored.balance);
    }

    let settled = state
        .reconciler
        .settle_round(
            request.round_id,
            request.account_id,
            request.winning_number,
            expected.as_ref(),
        )
        .await
        .map_err(fail)?;

    metrics::settlements_total(if settled.is_win() { "win" } else { "loss" });
    metrics::payout_amount(settled.net_payout);

    Ok(Json(SettleResponse {
        round_id: settled.round_id,
        winning_number: settled.winning_number,
        total_win: settled.total_win,
        net_payout: settled.net_payout,
        new_balance: settled.new_balance,
        total_stake: settled.total_stake,
    }))
}

/// Resolve every client wager to its board cell and collect them in a ledger.
fn build_ledger(
    wagers: &[WagerRequest],
    limits: &RouletteConfig,
) -> Result<BetLedger, WalletError> {
    let mut ledger = BetLedger::new();

    for wager in wagers {
        let key = CellKey {
            bet_type: wager.bet_type,
            numbers: wager.numbers.iter().copied().collect(),
        };
        let cell = board()
            .find(&key)
            .ok_or_else(|| WalletError::Validation(format!("{key} is not on the board")))?;

        if wager.odds != cell.odds {
            return Err(WalletError::Validation(format!(
                "{key} pays {} to 1, not {}",
                cell.odds, wager.odds
            )));
        }
        if wager.amount <= 0 || wager.amount > limits.max_wager {
            return Err(WalletError::Validation(format!(
                "amount on {key} must be between 1 and {}",
                limits.max_wager
            )));
        }

        ledger.place_bet(cell, wager.amount)?;

        // Repeated entries on one cell are merged; the limit applies to the sum.
        let merged = ledger.get(&key).map_or(0, |placed| placed.amount);
        if merged > limits.max_wager {
            return Err(WalletError::Validation(format!(
                "total on {key} is {merged}, above the maximum of {}",
                limits.max_wager
            )));
        }
    }

    Ok(ledger)
}

/// A claimed balance must be a whole number of currency units.
fn claimed_amount(value: &serde_json::Value) -> Result<i64, WalletError> {
    value.as_i64().ok_or_else(|| {
        WalletError::InvalidAmount(format!("claimed balance {value} is not an integer"))
    })
}
