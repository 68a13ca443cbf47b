//! Optimistic balance bookkeeping for one player's round.
//!
//! A [`BalanceSession`] holds the last confirmed balance (`original`), the
//! balance shown while betting (`displayed`) and the round's [`BetLedger`].
//! Stakes leave the displayed balance the moment they are placed; nothing here
//! is ever written to the account store. Only
//! [`BalanceReconciler`](crate::wallet::BalanceReconciler) does that, and its
//! answer replaces both values.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{
    board::Cell,
    errors::{RouletteError, RouletteResult},
    ledger::BetLedger,
};

/// Where the round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    /// Bets can be placed and removed
    Betting,
    /// Sent for settlement; waiting for the authoritative balance
    Pending,
}

#[derive(Debug, Clone)]
pub struct BalanceSession {
    original_balance: i64,
    displayed_balance: i64,
    ledger: BetLedger,
    state: RoundState,
}

impl BalanceSession {
    /// Start a session from a confirmed balance.
    pub fn new(confirmed_balance: i64) -> Self {
        Self {
            original_balance: confirmed_balance,
            displayed_balance: confirmed_balance,
            ledger: BetLedger::new(),
            state: RoundState::Betting,
        }
    }

    pub fn original_balance(&self) -> i64 {
        self.original_balance
    }

    pub fn displayed_balance(&self) -> i64 {
        self.displayed_balance
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    fn ensure_betting(&self) -> RouletteResult<()> {
        match self.state {
            RoundState::Betting => Ok(()),
            RoundState::Pending => Err(RouletteError::validation(
                "round is pending settlement; bets are closed",
            )),
        }
    }

    /// Stake up to `amount` on `cell`, capped by the displayed balance.
    ///
    /// Returns the amount actually staked (possibly 0).
    pub fn place_bet(&mut self, cell: &Cell, amount: i64) -> RouletteResult<i64> {
        self.ensure_betting()?;

        let staked = amount.min(self.displayed_balance);
        if staked <= 0 {
            return Ok(0);
        }

        self.ledger.place_bet(cell, staked)?;
        self.displayed_balance -= staked;
        Ok(staked)
    }

    /// Take up to `amount` back from `cell`. Returns the refund.
    pub fn remove_bet(&mut self, cell: &Cell, amount: i64) -> RouletteResult<i64> {
        self.ensure_betting()?;

        let refunded = self.ledger.remove_bet(cell, amount);
        self.displayed_balance += refunded;
        Ok(refunded)
    }

    /// Refund every stake and empty the ledger.
    pub fn clear_bets(&mut self) -> RouletteResult<i64> {
        self.ensure_betting()?;

        let refunded = self.ledger.total_wagered()?;
        self.ledger.clear();
        self.displayed_balance = self
            .displayed_balance
            .checked_add(refunded)
            .ok_or_else(|| RouletteError::overflow("displayed balance"))?;
        Ok(refunded)
    }

    /// Close betting and hand out the ledger for settlement.
    pub fn begin_settlement(&mut self) -> RouletteResult<&BetLedger> {
        self.ensure_betting()?;
        self.state = RoundState::Pending;
        Ok(&self.ledger)
    }

    /// Accept the store's balance after a committed settlement.
    ///
    /// Both balances become `authoritative_balance`, even if the optimistic
    /// arithmetic disagrees; the disagreement is logged.
    pub fn confirm_settlement(&mut self, authoritative_balance: i64, net_payout: i64) {
        let expected = self.displayed_balance.saturating_add(net_payout);
        if expected != authoritative_balance {
            warn!("Displayed balance drifted: expected {expected}, got {authoritative_balance}");
        }

        self.original_balance = authoritative_balance;
        self.displayed_balance = authoritative_balance;
        self.ledger.clear();
        self.state = RoundState::Betting;
    }

    /// Settlement did not go through. Balances stay as they are and the round
    /// stays pending so the same settlement can be retried.
    pub fn settlement_failed(&mut self) {
        debug!(
            "Settlement failed; round stays pending (displayed {}, original {})",
            self.displayed_balance, self.original_balance
        );
    }

    /// Throw the round away and start over from a confirmed balance.
    pub fn reset(&mut self, confirmed_balance: i64) {
        *self = Self::new(confirmed_balance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roulette::board::board;

    fn straight(n: u8) -> Cell {
        board().straight(n).unwrap().clone()
    }

    #[test]
    fn test_balances_start_equal() {
        let session = BalanceSession::new(1000);
        assert_eq!(session.original_balance(), 1000);
        assert_eq!(session.displayed_balance(), 1000);
        assert_eq!(session.state(), RoundState::Betting);
    }

    #[test]
    fn test_only_displayed_balance_moves_while_betting() {
        let mut session = BalanceSession::new(1000);
        assert_eq!(session.place_bet(&straight(7), 100).unwrap(), 100);
        assert_eq!(session.displayed_balance(), 900);
        assert_eq!(session.original_balance(), 1000);

        assert_eq!(session.remove_bet(&straight(7), 40).unwrap(), 40);
        assert_eq!(session.displayed_balance(), 940);
        assert_eq!(session.ledger().total_wagered().unwrap(), 60);
    }

    #[test]
    fn test_stake_is_capped_by_displayed_balance() {
        let mut session = BalanceSession::new(50);
        assert_eq!(session.place_bet(&straight(1), 80).unwrap(), 50);
        assert_eq!(session.displayed_balance(), 0);
        assert_eq!(session.place_bet(&straight(2), 10).unwrap(), 0);
        assert_eq!(session.ledger().len(), 1);
    }

    #[test]
    fn test_clear_bets_refunds_everything() {
        let mut session = BalanceSession::new(500);
        session.place_bet(&straight(1), 100).unwrap();
        session.place_bet(&straight(2), 50).unwrap();
        assert_eq!(session.clear_bets().unwrap(), 150);
        assert_eq!(session.displayed_balance(), 500);
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_pending_round_rejects_bets() {
        let mut session = BalanceSession::new(500);
        session.place_bet(&straight(1), 100).unwrap();
        session.begin_settlement().unwrap();

        assert!(session.place_bet(&straight(2), 10).is_err());
        assert!(session.remove_bet(&straight(1), 10).is_err());
        assert!(session.begin_settlement().is_err());
    }

    #[test]
    fn test_failed_settlement_leaves_balances_untouched() {
        let mut session = BalanceSession::new(500);
        session.place_bet(&straight(1), 100).unwrap();
        session.begin_settlement().unwrap();
        session.settlement_failed();

        assert_eq!(session.state(), RoundState::Pending);
        assert_eq!(session.displayed_balance(), 400);
        assert_eq!(session.original_balance(), 500);
        assert_eq!(session.ledger().total_wagered().unwrap(), 100);
    }

    #[test]
    fn test_confirm_adopts_authoritative_balance() {
        let mut session = BalanceSession::new(1000);
        session.place_bet(&straight(7), 10).unwrap();
        session.begin_settlement().unwrap();
        session.confirm_settlement(1350, 360);

        assert_eq!(session.original_balance(), 1350);
        assert_eq!(session.displayed_balance(), 1350);
        assert!(session.ledger().is_empty());
        assert_eq!(session.state(), RoundState::Betting);
    }

    #[test]
    fn test_confirm_prefers_store_over_local_arithmetic() {
        let mut session = BalanceSession::new(1000);
        session.place_bet(&straight(7), 10).unwrap();
        session.begin_settlement().unwrap();
        session.confirm_settlement(700, 0);
        assert_eq!(session.displayed_balance(), 700);
    }

    #[test]
    fn test_reset() {
        let mut session = BalanceSession::new(1000);
        session.place_bet(&straight(7), 10).unwrap();
        session.reset(200);
        assert_eq!(session.displayed_balance(), 200);
        assert!(session.ledger().is_empty());
    }
}
