//! Settlement: outcome of a ledger for a winning number.

use serde::{Deserialize, Serialize};

use super::{
    errors::{RouletteError, RouletteResult},
    ledger::{BetLedger, Wager},
    wheel::MAX_NUMBER,
};

/// Result of one wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerOutcome {
    pub wager: Wager,
    pub won: bool,
    /// Profit only, zero on a loss
    pub win_amount: i64,
}

/// Settlement of a whole round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub winning_number: u8,
    pub outcomes: Vec<WagerOutcome>,
    pub total_win: i64,
    pub total_stake: i64,
    /// Credit owed to a balance that already had the stakes taken out:
    /// stake plus profit of every winning wager
    pub net_balance_delta: i64,
}

impl SettlementResult {
    /// Change to a stored balance that has not been debited yet.
    ///
    /// Stakes go out and winning stakes plus profit come back in, so this is
    /// `net_balance_delta - total_stake`.
    pub fn authoritative_delta(&self) -> i64 {
        // Both operands are non-negative, so the subtraction cannot overflow.
        self.net_balance_delta - self.total_stake
    }

    /// The round left the account better off than before it was staked.
    pub fn is_win(&self) -> bool {
        self.authoritative_delta() > 0
    }

    pub fn winning_wagers(&self) -> impl Iterator<Item = &WagerOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.won)
    }
}

/// Check that `number` is a pocket on the wheel.
///
/// # Errors
///
/// * `RouletteError::Validation` - Negative or above 36
pub fn validate_winning_number(number: i64) -> RouletteResult<u8> {
    u8::try_from(number)
        .ok()
        .filter(|&n| n <= MAX_NUMBER)
        .ok_or_else(|| {
            RouletteError::validation(format!(
                "winning number {number} is outside 0..={MAX_NUMBER}"
            ))
        })
}

/// Settle `ledger` against `winning_number`.
///
/// A wager wins exactly when its own number set contains the winning number.
/// Pure: calling it twice with the same inputs yields the same result.
///
/// # Errors
///
/// * `RouletteError::Validation` - Winning number not in `0..=36`
/// * `RouletteError::InvalidAmount` - A total overflows
pub fn settle(winning_number: i64, ledger: &BetLedger) -> RouletteResult<SettlementResult> {
    let winning_number = validate_winning_number(winning_number)?;

    let mut outcomes = Vec::with_capacity(ledger.len());
    let mut total_win = 0i64;
    let mut total_stake = 0i64;
    let mut net_balance_delta = 0i64;

    for wager in ledger.wagers() {
        if wager.amount < 0 {
            return Err(RouletteError::InvalidAmount(format!(
                "negative stake on {}",
                wager.key()
            )));
        }

        let won = wager.covers(winning_number);
        let win_amount = if won {
            wager
                .amount
                .checked_mul(i64::from(wager.odds()))
                .ok_or_else(|| RouletteError::overflow("win amount"))?
        } else {
            0
        };

        total_stake = total_stake
            .checked_add(wager.amount)
            .ok_or_else(|| RouletteError::overflow("total stake"))?;

        if won {
            total_win = total_win
                .checked_add(win_amount)
                .ok_or_else(|| RouletteError::overflow("total win"))?;
            net_balance_delta = wager
                .amount
                .checked_add(win_amount)
                .and_then(|credit| net_balance_delta.checked_add(credit))
                .ok_or_else(|| RouletteError::overflow("payout"))?;
        }

        outcomes.push(WagerOutcome {
            wager: wager.clone(),
            won,
            win_amount,
        });
    }

    Ok(SettlementResult {
        winning_number,
        outcomes,
        total_win,
        total_stake,
        net_balance_delta,
    })
}
