//! # Casino
//!
//! Roulette betting and settlement core for an online casino backend.
//!
//! The library covers one round of European (single-zero) roulette from the
//! board a client bets on to the balance stored for the account:
//!
//! - **Board topology**: every biddable cell and its payout ratio
//! - **Bet ledger**: the wagers of one round, keyed by cell
//! - **Settlement**: pure outcome of a ledger for a winning number
//! - **Balance session**: optimistic displayed balance while betting
//! - **Balance reconciler**: transactional, exactly-once balance updates
//!
//! ## Core Modules
//!
//! - [`roulette`]: Board, wheel, ledger, settlement and balance session
//! - [`wallet`]: Balance reconciler, round registry and bet history
//! - [`db`]: PostgreSQL pool, account store trait and an in-memory store
//!
//! ## Example
//!
//! ```
//! use casino::roulette::{BetLedger, board, settle};
//!
//! let mut ledger = BetLedger::new();
//! ledger.place_bet(board().outside("RED").unwrap(), 20).unwrap();
//!
//! let result = settle(3, &ledger).unwrap();
//! assert_eq!(result.total_win, 20);
//! assert_eq!(result.net_balance_delta, 40);
//! ```

/// Roulette board, ledger, settlement and balance session.
pub mod roulette;
pub use roulette::{BalanceSession, BetLedger, BetType, Cell, CellKey, SettlementResult};

/// Authoritative balances and round settlement.
pub mod wallet;

/// Database connection and account store.
pub mod db;
