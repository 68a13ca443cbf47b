//! Wallet error types.

use thiserror::Error;
use uuid::Uuid;

use crate::{db::timeouts::TimeoutError, roulette::RouletteError};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No balance row for the account
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// A transactional step could not complete; the unit of work was rolled
    /// back and the whole flow can be retried
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Amount out of range, overflow, or an unusable stored balance
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// No pending round with this id for the account
    #[error("Round not found: {0}")]
    RoundNotFound(Uuid),

    /// The round has already been credited
    #[error("Round already settled: {0}")]
    RoundAlreadySettled(Uuid),

    /// Malformed request
    #[error("Validation error: {0}")]
    Validation(String),
}

impl WalletError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized to prevent information disclosure about
    /// the internal system structure, and account IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Database(_) => "Internal server error".to_string(),
            WalletError::AccountNotFound(_) => "Account not found".to_string(),
            WalletError::Concurrency(_) => {
                "Balance update could not complete; the round is safe to retry".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Concurrency(_))
    }
}

impl From<TimeoutError> for WalletError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => {
                WalletError::Concurrency(format!("store operation timed out after {duration:?}"))
            }
            TimeoutError::Database(e) => WalletError::Database(e),
        }
    }
}

impl From<RouletteError> for WalletError {
    fn from(err: RouletteError) -> Self {
        match err {
            RouletteError::Validation(msg) => WalletError::Validation(msg),
            RouletteError::InvalidAmount(msg) => WalletError::InvalidAmount(msg),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_message_hides_database_details() {
        let err = WalletError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");

        let err = WalletError::AccountNotFound(42);
        assert!(!err.client_message().contains("42"));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err: WalletError = TimeoutError::Timeout(Duration::from_secs(10)).into();
        assert!(err.is_retryable());
        assert!(matches!(err, WalletError::Concurrency(_)));
    }

    #[test]
    fn test_roulette_errors_convert() {
        let err: WalletError = RouletteError::Validation("bad".into()).into();
        assert!(matches!(err, WalletError::Validation(_)));
        let err: WalletError = RouletteError::InvalidAmount("big".into()).into();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }
}
