//! Roulette error types.

use thiserror::Error;

/// Errors raised by the pure roulette components (board, ledger, settlement).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouletteError {
    /// Malformed winning number, cell or wager
    #[error("Validation error: {0}")]
    Validation(String),

    /// Amount is negative where it must not be, or arithmetic overflowed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl RouletteError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn overflow(what: &str) -> Self {
        Self::InvalidAmount(format!("{what} overflows the currency range"))
    }
}

/// Result type for roulette operations
pub type RouletteResult<T> = Result<T, RouletteError>;
