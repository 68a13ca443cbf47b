//! Roulette betting core: board topology, bet ledger, settlement and the
//! optimistic balance session.
//!
//! Everything in this module is pure and synchronous. Persisting a settled
//! round is the job of [`crate::wallet::BalanceReconciler`].
//!
//! ## Example
//!
//! ```
//! use casino::roulette::{BalanceSession, board, settle};
//!
//! let mut session = BalanceSession::new(1000);
//! let seven = board().straight(7).unwrap();
//! session.place_bet(seven, 10).unwrap();
//!
//! let result = settle(7, session.ledger()).unwrap();
//! assert_eq!(result.total_win, 350);
//! assert_eq!(result.net_balance_delta, 360);
//! ```

pub mod board;
pub mod errors;
pub mod ledger;
pub mod session;
pub mod settlement;
pub mod wheel;

pub use board::{BetType, Board, Cell, CellKey, board, generate_board};
pub use errors::{RouletteError, RouletteResult};
pub use ledger::{BetLedger, Wager};
pub use session::{BalanceSession, RoundState};
pub use settlement::{SettlementResult, WagerOutcome, settle, validate_winning_number};
pub use wheel::{Color, color_of, spin};
