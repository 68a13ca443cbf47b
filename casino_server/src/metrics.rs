//! Prometheus metrics for monitoring roulette server health.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener.
//! Until [`init_metrics`] is called every recorder call is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use casino_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/roulette/settle", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Roulette Metrics
// ============================================================================

/// Increment rounds opened counter.
pub fn rounds_opened_total() {
    metrics::counter!("roulette_rounds_opened_total").increment(1);
}

/// Increment settlements counter, labelled `win`, `loss` or `error`.
pub fn settlements_total(outcome: &str) {
    metrics::counter!("roulette_settlements_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the amount returned to the player for a settled round.
pub fn payout_amount(net_payout: i64) {
    metrics::histogram!("roulette_payout_amount").record(net_payout as f64);
}

// ============================================================================
// Wallet Metrics
// ============================================================================

/// Increment reconciliation failures, labelled by error kind.
pub fn reconciliation_failures_total(kind: &str) {
    metrics::counter!("reconciliation_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls must be harmless.
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        rounds_opened_total();
        settlements_total("win");
        payout_amount(360);
        reconciliation_failures_total("concurrency");
    }
}
