//! Per-round bet ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    board::{BetType, Cell, CellKey},
    errors::{RouletteError, RouletteResult},
};

/// Money riding on one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wager {
    #[serde(flatten)]
    pub cell: Cell,
    pub amount: i64,
}

impl Wager {
    pub fn key(&self) -> CellKey {
        self.cell.key()
    }

    /// Payout odds of the wager's bet type.
    pub fn odds(&self) -> u32 {
        self.cell.bet_type.odds()
    }

    pub fn bet_type(&self) -> BetType {
        self.cell.bet_type
    }

    pub fn label(&self) -> &str {
        &self.cell.label
    }

    pub fn covers(&self, number: u8) -> bool {
        self.cell.covers(number)
    }
}

/// Active wagers of one round, at most one per cell.
///
/// The ledger only tracks stakes; debiting and refunding a balance is the
/// caller's job (see [`BalanceSession`](super::session::BalanceSession)).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BetLedger {
    wagers: BTreeMap<CellKey, Wager>,
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the wager on `cell`, creating it if needed.
    ///
    /// Non-positive amounts are ignored.
    ///
    /// # Errors
    ///
    /// * `RouletteError::Validation` - The cell's odds are not its bet type's
    /// * `RouletteError::InvalidAmount` - The accumulated stake would overflow;
    ///   the ledger is left unchanged
    pub fn place_bet(&mut self, cell: &Cell, amount: i64) -> RouletteResult<()> {
        if amount <= 0 {
            return Ok(());
        }
        if cell.odds != cell.bet_type.odds() {
            return Err(RouletteError::validation(format!(
                "{} pays {} to 1, not {}",
                cell.key(),
                cell.bet_type.odds(),
                cell.odds
            )));
        }

        match self.wagers.get_mut(&cell.key()) {
            Some(wager) => {
                wager.amount = wager
                    .amount
                    .checked_add(amount)
                    .ok_or_else(|| RouletteError::overflow("wager"))?;
            }
            None => {
                self.wagers.insert(
                    cell.key(),
                    Wager {
                        cell: cell.clone(),
                        amount,
                    },
                );
            }
        }

        Ok(())
    }

    /// Take up to `amount` off the wager on `cell`.
    ///
    /// Returns how much was actually removed. The wager disappears once it
    /// reaches zero.
    pub fn remove_bet(&mut self, cell: &Cell, amount: i64) -> i64 {
        if amount <= 0 {
            return 0;
        }

        let key = cell.key();
        let Some(wager) = self.wagers.get_mut(&key) else {
            return 0;
        };

        let removed = amount.min(wager.amount);
        wager.amount -= removed;
        if wager.amount == 0 {
            self.wagers.remove(&key);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.wagers.clear();
    }

    /// Sum of all stakes.
    ///
    /// # Errors
    ///
    /// * `RouletteError::InvalidAmount` - The sum overflows
    pub fn total_wagered(&self) -> RouletteResult<i64> {
        self.wagers.values().try_fold(0i64, |total, wager| {
            total
                .checked_add(wager.amount)
                .ok_or_else(|| RouletteError::overflow("total stake"))
        })
    }

    pub fn get(&self, key: &CellKey) -> Option<&Wager> {
        self.wagers.get(key)
    }

    /// Wagers in cell-key order.
    pub fn wagers(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.values()
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }
}
