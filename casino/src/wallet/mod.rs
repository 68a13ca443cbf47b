//! Wallet module: authoritative balances, the round registry and bet history.
//!
//! This module implements:
//! - `BalanceReconciler`, the only writer of stored balances
//! - Rounds whose wagers are committed and debited before the spin is revealed
//! - Exactly-once round settlement against the committed wagers
//! - Bet history and per-day game statistics
//!
//! ## Example
//!
//! ```no_run
//! use casino::db::{Database, DatabaseConfig};
//! use casino::roulette::{BetLedger, board};
//! use casino::wallet::BalanceReconciler;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let reconciler = BalanceReconciler::new(Arc::new(db.account_store()));
//!
//!     let mut ledger = BetLedger::new();
//!     ledger.place_bet(board().outside("RED").unwrap(), 20)?;
//!
//!     // Stakes are committed and debited before the number is revealed.
//!     let opened = reconciler.open_round(1, &ledger, &mut rand::rng()).await?;
//!     let round = opened.round;
//!
//!     let settled = reconciler
//!         .settle_round(round.round_id, 1, i64::from(round.winning_number), None)
//!         .await?;
//!     println!("New balance: {}", settled.new_balance);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod models;
pub mod reconciler;

pub use errors::{WalletError, WalletResult};
pub use models::{
    AccountBalance, AccountId, BetRecord, DailyStats, OpenedRound, RoundRecord, RoundStatus,
    SettledRound,
};
pub use reconciler::{BalanceReconciler, MAX_PAGE_SIZE};
