//! Structured logging configuration.
//!
//! Sets up the tracing subscriber and provides helpers for the balance
//! events operators need to correlate across requests.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`. Records from the `log` facade used by the
/// `casino` library are forwarded to the same subscriber.
///
/// # Example
///
/// ```no_run
/// use casino_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    // Console layer for development
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a client balance claim that disagrees with the stored balance
///
/// The stored balance always wins; the claim is only recorded.
///
/// # Arguments
///
/// * `request_id` - Correlation id of the request
/// * `account_id` - Account being settled
/// * `claimed` - Balance the client believed it had before the round
/// * `stored` - Balance on record before the round
pub fn log_balance_drift(request_id: &str, account_id: i64, claimed: i64, stored: i64) {
    if claimed == stored {
        return;
    }

    tracing::warn!(
        request_id = %request_id,
        account_id = account_id,
        claimed = claimed,
        stored = stored,
        drift = claimed.saturating_sub(stored),
        "BALANCE: client claim disagrees with stored balance"
    );
}

/// Log a reconciliation step that failed and was rolled back
///
/// # Arguments
///
/// * `request_id` - Correlation id of the request
/// * `operation` - Operation name, e.g. `settle`
/// * `error` - Error description
pub fn log_reconciliation_failure(request_id: &str, operation: &str, error: &str) {
    tracing::error!(
        request_id = %request_id,
        operation = operation,
        error = error,
        "Reconciliation failed, no balance change applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_balance_drift() {
        // Just ensure it doesn't panic
        log_balance_drift("req-1", 1, 1000, 1000);
        log_balance_drift("req-2", 1, i64::MIN, i64::MAX);
    }

    #[test]
    fn test_log_reconciliation_failure() {
        log_reconciliation_failure("req-1", "settle", "lock timeout");
    }
}
