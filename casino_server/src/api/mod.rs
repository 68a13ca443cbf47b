//! HTTP API for the roulette server.
//!
//! # Modules
//!
//! - [`roulette`]: Board catalog, spins and settlement
//! - [`accounts`]: Balances, bet history and daily stats
//! - [`request_id`]: Request correlation middleware
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                - Store connectivity
//! GET  /api/v1/roulette/board                 - Board document (cacheable)
//! POST /api/v1/roulette/spin                  - Open a round
//! POST /api/v1/roulette/settle                - Settle a round
//! GET  /api/v1/accounts/{account_id}/balance  - Stored balance
//! POST /api/v1/accounts/{account_id}/balance  - Apply a signed delta
//! GET  /api/v1/accounts/{account_id}/bets     - Bet history, newest first
//! GET  /api/v1/accounts/{account_id}/stats    - Daily stats, newest first
//! GET  /api/v1/rounds/{round_id}/bets         - Bets of one round
//! ```
//!
//! Account ids are supplied by the caller; authentication happens in front
//! of this service.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use casino::{db::MemoryAccountStore, wallet::BalanceReconciler};
//! use casino_server::{api::{create_router, AppState}, config::RouletteConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryAccountStore::with_accounts([(1, 10_000)]);
//! let state = AppState {
//!     reconciler: Arc::new(BalanceReconciler::new(Arc::new(store))),
//!     config: Arc::new(RouletteConfig::default()),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod accounts;
pub mod request_id;
pub mod roulette;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use casino::wallet::{BalanceReconciler, WalletError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower_http::cors::CorsLayer;

use crate::{config::RouletteConfig, logging, metrics};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; both fields are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<BalanceReconciler>,
    pub config: Arc<RouletteConfig>,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// True when the same request may succeed if sent again
    pub retryable: bool,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// 400 with a plain message, for request shape problems caught before the
/// reconciler is involved.
pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
            retryable: false,
        }),
    )
}

/// Map a wallet error to its HTTP status and a sanitized body.
///
/// Server-side failures are logged with the request id before the details
/// are dropped from the response.
pub(crate) fn wallet_error(request_id: &str, operation: &str, err: WalletError) -> ApiError {
    let status = match &err {
        WalletError::Validation(_)
        | WalletError::InvalidAmount(_)
        | WalletError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        WalletError::AccountNotFound(_) | WalletError::RoundNotFound(_) => StatusCode::NOT_FOUND,
        WalletError::RoundAlreadySettled(_) => StatusCode::CONFLICT,
        WalletError::Concurrency(_) => StatusCode::SERVICE_UNAVAILABLE,
        WalletError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match &err {
        WalletError::Concurrency(_) => {
            metrics::reconciliation_failures_total("concurrency");
            logging::log_reconciliation_failure(request_id, operation, &err.to_string());
        }
        WalletError::Database(_) => {
            metrics::reconciliation_failures_total("database");
            logging::log_reconciliation_failure(request_id, operation, &err.to_string());
        }
        _ => {
            tracing::debug!(request_id = %request_id, operation, error = %err, "Request rejected");
        }
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
            retryable: err.is_retryable(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use casino_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .route_layer(axum::middleware::from_fn(track_metrics))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let roulette_routes = Router::new()
        .route("/roulette/board", get(roulette::get_board))
        .route("/roulette/spin", post(roulette::spin))
        .route("/roulette/settle", post(roulette::settle));

    let account_routes = Router::new()
        .route(
            "/accounts/{account_id}/balance",
            get(accounts::get_balance).post(accounts::apply_delta),
        )
        .route("/accounts/{account_id}/bets", get(accounts::bet_history))
        .route("/accounts/{account_id}/stats", get(accounts::daily_stats))
        .route("/rounds/{round_id}/bets", get(accounts::round_bets));

    Router::new().merge(roulette_routes).merge(account_routes)
}

/// Record request count and latency per matched route.
async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    // Route templates keep label cardinality bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    metrics::http_requests_total(&method, &path, response.status().as_u16());
    metrics::http_request_duration_ms(&method, &path, start.elapsed().as_secs_f64() * 1000.0);
    response
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the account store answers, `503 Service Unavailable`
/// otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","version":"0.1.0","database":true,"timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = state.reconciler.store().health_check().await.is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: WalletError) -> (StatusCode, bool) {
        let (status, Json(body)) = wallet_error("test", "test", err);
        (status, body.retryable)
    }

    #[test]
    fn test_wallet_error_status_mapping() {
        let round = Uuid::new_v4();
        assert_eq!(
            status_of(WalletError::Validation("x".into())),
            (StatusCode::BAD_REQUEST, false)
        );
        assert_eq!(
            status_of(WalletError::InsufficientBalance {
                available: 1,
                required: 2
            }),
            (StatusCode::BAD_REQUEST, false)
        );
        assert_eq!(
            status_of(WalletError::RoundNotFound(round)),
            (StatusCode::NOT_FOUND, false)
        );
        assert_eq!(
            status_of(WalletError::RoundAlreadySettled(round)),
            (StatusCode::CONFLICT, false)
        );
        assert_eq!(
            status_of(WalletError::Concurrency("lock".into())),
            (StatusCode::SERVICE_UNAVAILABLE, true)
        );
        assert_eq!(
            status_of(WalletError::Database(sqlx::Error::PoolTimedOut)),
            (StatusCode::INTERNAL_SERVER_ERROR, false)
        );
    }

    #[test]
    fn test_database_errors_are_sanitized() {
        let (_, Json(body)) = wallet_error(
            "test",
            "settle",
            WalletError::Database(sqlx::Error::Protocol("relation \"secret\"".into())),
        );
        assert_eq!(body.error, "Internal server error");
    }
}
