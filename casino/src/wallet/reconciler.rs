//! Balance reconciler: the only writer of authoritative balances.

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    errors::{WalletError, WalletResult},
    models::{
        AccountBalance, AccountId, BetRecord, DailyStats, OpenedRound, RoundRecord, RoundStatus,
        SettledRound,
    },
};
use crate::{
    db::{AccountStore, UnitOfWork},
    roulette::{BetLedger, CellKey, SettlementResult, board, settle, spin, validate_winning_number},
};

/// Upper bound on history and stats page sizes
pub const MAX_PAGE_SIZE: i64 = 500;

/// A transactional step failed for a reason other than the domain rules;
/// the flow as a whole can be retried.
fn step_failed(step: &str, err: WalletError) -> WalletError {
    match err {
        WalletError::Database(e) => WalletError::Concurrency(format!("{step} failed: {e}")),
        WalletError::Concurrency(msg) => WalletError::Concurrency(format!("{step} failed: {msg}")),
        other => other,
    }
}

fn checked_balance(account_id: AccountId, balance: Option<i64>) -> WalletResult<i64> {
    let balance = balance.ok_or(WalletError::AccountNotFound(account_id))?;
    if balance < 0 {
        return Err(WalletError::InvalidAmount(format!(
            "stored balance {balance} is negative"
        )));
    }
    Ok(balance)
}

fn page_size(limit: i64) -> WalletResult<i64> {
    if limit <= 0 {
        return Err(WalletError::Validation(format!(
            "limit must be positive, got {limit}"
        )));
    }
    Ok(limit.min(MAX_PAGE_SIZE))
}

/// Applies balance changes and settlements to an [`AccountStore`].
///
/// Every mutating operation runs in exactly one unit of work and rolls it
/// back on any failure, so a failed call leaves the stored balance as it was.
#[derive(Clone)]
pub struct BalanceReconciler {
    store: Arc<dyn AccountStore>,
}

impl BalanceReconciler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Authoritative balance of an account
    ///
    /// # Errors
    ///
    /// * `WalletError::AccountNotFound` - No balance row
    /// * `WalletError::InvalidAmount` - Stored balance is negative or unreadable
    pub async fn balance(&self, account_id: AccountId) -> WalletResult<AccountBalance> {
        let balance = checked_balance(account_id, self.store.balance(account_id).await?)?;
        Ok(AccountBalance {
            account_id,
            balance,
        })
    }

    /// Add `delta` (possibly negative) to an account's balance
    ///
    /// # Returns
    ///
    /// * `WalletResult<i64>` - New authoritative balance
    ///
    /// # Errors
    ///
    /// * `WalletError::AccountNotFound` - No balance row
    /// * `WalletError::InsufficientBalance` - The balance would go negative
    /// * `WalletError::InvalidAmount` - Overflow, or unusable stored balance
    /// * `WalletError::Concurrency` - A transactional step failed or the
    ///   verify read disagreed; nothing was changed
    pub async fn apply_delta(&self, account_id: AccountId, delta: i64) -> WalletResult<i64> {
        let seen = self.balance(account_id).await?.balance;
        log::debug!("Applying delta {delta} to account {account_id} (last seen balance {seen})");

        let mut uow = self
            .store
            .begin()
            .await
            .map_err(|e| step_failed("begin", e))?;

        let outcome = apply_in(uow.as_mut(), account_id, delta).await;
        match outcome {
            Ok(new_balance) => {
                uow.commit().await.map_err(|e| step_failed("commit", e))?;
                log::info!("Account {account_id}: applied delta {delta}, balance {new_balance}");
                Ok(new_balance)
            }
            Err(e) => Err(abort(uow, e).await),
        }
    }

    /// Commit `ledger` for the account, debit its stake and spin the wheel
    ///
    /// The round, its bets and the debit are written in one unit of work, so
    /// the winning number only leaves this call once the wagers are fixed and
    /// paid for. A round that is never settled keeps its stake.
    ///
    /// # Errors
    ///
    /// * `WalletError::Validation` - Empty ledger
    /// * `WalletError::AccountNotFound` - No balance row
    /// * `WalletError::InsufficientBalance` - Stored balance below total stake
    /// * `WalletError::InvalidAmount` - Overflow, or unusable stored balance
    /// * `WalletError::Concurrency` - A transactional step failed; no round
    ///   was opened and nothing was debited
    pub async fn open_round<R: Rng + ?Sized>(
        &self,
        account_id: AccountId,
        ledger: &BetLedger,
        rng: &mut R,
    ) -> WalletResult<OpenedRound> {
        if ledger.is_empty() {
            return Err(WalletError::Validation(
                "a round needs at least one wager".to_string(),
            ));
        }
        let total_stake = ledger.total_wagered()?;
        let round = RoundRecord::pending(account_id, spin(rng), total_stake);

        let mut uow = self
            .store
            .begin()
            .await
            .map_err(|e| step_failed("begin", e))?;

        let balance = match open_in(uow.as_mut(), &round, ledger).await {
            Ok(balance) => balance,
            Err(e) => return Err(abort(uow, e).await),
        };
        uow.commit().await.map_err(|e| step_failed("commit", e))?;

        log::info!(
            "Opened round {} for account {account_id}: stake {total_stake}, balance {balance}",
            round.round_id
        );
        Ok(OpenedRound { round, balance })
    }

    /// Settle a pending round and credit the account, exactly once
    ///
    /// Pays out the wagers committed when the round was opened. When
    /// `expected` is given it must match them exactly. Winnings are credited,
    /// the bet history is completed and the round is marked settled in one
    /// unit of work. Daily stats are updated after commit; a failure there is
    /// logged and does not fail the settlement.
    ///
    /// # Errors
    ///
    /// * `WalletError::Validation` - Winning number off the wheel, not the
    ///   number spun for this round, or `expected` differs from the
    ///   committed wagers
    /// * `WalletError::RoundNotFound` - Unknown round, or another account's
    /// * `WalletError::RoundAlreadySettled` - The round was already credited
    /// * `WalletError::AccountNotFound` - No balance row
    /// * `WalletError::InvalidAmount` - Overflow, or unusable stored data
    /// * `WalletError::Concurrency` - A transactional step failed; the round
    ///   is still pending and safe to retry
    pub async fn settle_round(
        &self,
        round_id: Uuid,
        account_id: AccountId,
        winning_number: i64,
        expected: Option<&BetLedger>,
    ) -> WalletResult<SettledRound> {
        let winning_number = validate_winning_number(winning_number)?;

        let mut uow = self
            .store
            .begin()
            .await
            .map_err(|e| step_failed("begin", e))?;

        let settled_at = Utc::now();
        let outcome = settle_in(
            uow.as_mut(),
            round_id,
            account_id,
            winning_number,
            expected,
            settled_at,
        )
        .await;
        let (result, new_balance) = match outcome {
            Ok(settled) => settled,
            Err(e) => return Err(abort(uow, e).await),
        };
        uow.commit().await.map_err(|e| step_failed("commit", e))?;

        log::info!(
            "Settled round {round_id} for account {account_id}: number {}, payout {}, balance {}",
            result.winning_number,
            result.net_balance_delta,
            new_balance
        );

        if let Err(e) = self
            .store
            .record_game(account_id, settled_at.date_naive(), result.is_win())
            .await
        {
            log::warn!("Failed to update daily stats for account {account_id}: {e}");
        }

        Ok(SettledRound {
            round_id,
            account_id,
            winning_number: result.winning_number,
            total_win: result.total_win,
            total_stake: result.total_stake,
            net_payout: result.net_balance_delta,
            new_balance,
            settled_at,
        })
    }

    /// Most recent bets of an account, newest first
    pub async fn bet_history(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> WalletResult<Vec<BetRecord>> {
        self.store.bet_history(account_id, page_size(limit)?).await
    }

    /// Bets of one round
    pub async fn round_bets(&self, round_id: Uuid) -> WalletResult<Vec<BetRecord>> {
        self.store.round_bets(round_id).await
    }

    /// Most recent daily stats of an account, newest day first
    pub async fn daily_stats(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> WalletResult<Vec<DailyStats>> {
        self.store.daily_stats(account_id, page_size(limit)?).await
    }
}

/// Roll back and hand back the error that caused it.
async fn abort(uow: Box<dyn UnitOfWork>, err: WalletError) -> WalletError {
    log::warn!("Rolling back balance transaction: {err}");
    if let Err(rollback_err) = uow.rollback().await {
        log::warn!("Rollback failed: {rollback_err}");
    }
    err
}

/// Write `new_balance` and read it back.
async fn write_and_verify(
    uow: &mut dyn UnitOfWork,
    account_id: AccountId,
    new_balance: i64,
) -> WalletResult<()> {
    uow.update_balance(account_id, new_balance)
        .await
        .map_err(|e| step_failed("update", e))?;

    let stored = uow
        .read_balance(account_id)
        .await
        .map_err(|e| step_failed("verify", e))?;
    if stored != Some(new_balance) {
        return Err(WalletError::Concurrency(format!(
            "verify read returned {stored:?}, expected {new_balance}"
        )));
    }
    Ok(())
}

async fn apply_in(
    uow: &mut dyn UnitOfWork,
    account_id: AccountId,
    delta: i64,
) -> WalletResult<i64> {
    let locked = uow
        .lock_balance(account_id)
        .await
        .map_err(|e| step_failed("lock", e))?;
    let current = checked_balance(account_id, locked)?;

    let new_balance = current.checked_add(delta).ok_or_else(|| {
        WalletError::InvalidAmount(format!("balance {current} + {delta} overflows"))
    })?;
    if new_balance < 0 {
        return Err(WalletError::InsufficientBalance {
            available: current,
            required: delta.saturating_neg(),
        });
    }

    write_and_verify(uow, account_id, new_balance).await?;
    Ok(new_balance)
}

/// Rebuild a ledger from stored bets, resolving each to its board cell.
fn ledger_from_bets(bets: &[BetRecord]) -> WalletResult<BetLedger> {
    let mut ledger = BetLedger::new();
    for bet in bets {
        let key = CellKey {
            bet_type: bet.bet_type,
            numbers: bet.numbers.iter().copied().collect(),
        };
        let cell = board().find(&key).ok_or_else(|| {
            WalletError::InvalidAmount(format!("stored bet {key} is not on the board"))
        })?;
        ledger.place_bet(cell, bet.amount)?;
    }
    Ok(ledger)
}

async fn open_in(
    uow: &mut dyn UnitOfWork,
    round: &RoundRecord,
    ledger: &BetLedger,
) -> WalletResult<i64> {
    let account_id = round.account_id;
    let locked = uow
        .lock_balance(account_id)
        .await
        .map_err(|e| step_failed("lock", e))?;
    let current = checked_balance(account_id, locked)?;
    if current < round.total_stake {
        return Err(WalletError::InsufficientBalance {
            available: current,
            required: round.total_stake,
        });
    }

    // Both are non-negative and the stake is no larger than the balance.
    let new_balance = current - round.total_stake;
    write_and_verify(uow, account_id, new_balance).await?;

    uow.insert_round(round)
        .await
        .map_err(|e| step_failed("insert round", e))?;
    let bets: Vec<BetRecord> = ledger
        .wagers()
        .map(|wager| BetRecord::committed(round.round_id, account_id, wager, round.created_at))
        .collect();
    uow.insert_bets(&bets)
        .await
        .map_err(|e| step_failed("history", e))?;

    Ok(new_balance)
}

async fn settle_in(
    uow: &mut dyn UnitOfWork,
    round_id: Uuid,
    account_id: AccountId,
    winning_number: u8,
    expected: Option<&BetLedger>,
    settled_at: chrono::DateTime<Utc>,
) -> WalletResult<(SettlementResult, i64)> {
    let round = uow
        .lock_round(round_id)
        .await
        .map_err(|e| step_failed("lock round", e))?
        .filter(|round| round.account_id == account_id)
        .ok_or(WalletError::RoundNotFound(round_id))?;

    if round.status == RoundStatus::Settled {
        return Err(WalletError::RoundAlreadySettled(round_id));
    }
    if round.winning_number != winning_number {
        return Err(WalletError::Validation(format!(
            "winning number {winning_number} does not match round {round_id}"
        )));
    }

    let bets = uow
        .committed_bets(round_id)
        .await
        .map_err(|e| step_failed("load bets", e))?;
    let ledger = ledger_from_bets(&bets)?;
    if expected.is_some_and(|expected| *expected != ledger) {
        return Err(WalletError::Validation(format!(
            "wagers do not match the ones committed for round {round_id}"
        )));
    }

    let result = settle(i64::from(winning_number), &ledger)?;
    if result.total_stake != round.total_stake {
        return Err(WalletError::InvalidAmount(format!(
            "committed bets of round {round_id} add up to {}, not {}",
            result.total_stake, round.total_stake
        )));
    }

    let locked = uow
        .lock_balance(account_id)
        .await
        .map_err(|e| step_failed("lock", e))?;
    let current = checked_balance(account_id, locked)?;

    // The stake left the balance when the round was opened.
    let new_balance = current
        .checked_add(result.net_balance_delta)
        .ok_or_else(|| WalletError::InvalidAmount("settled balance overflows".to_string()))?;
    write_and_verify(uow, account_id, new_balance).await?;

    let outcomes: Vec<BetRecord> = result
        .outcomes
        .iter()
        .map(|outcome| BetRecord::from_outcome(round_id, account_id, outcome, round.created_at))
        .collect();
    uow.record_outcomes(&outcomes)
        .await
        .map_err(|e| step_failed("history", e))?;
    uow.mark_round_settled(round_id, settled_at)
        .await
        .map_err(|e| step_failed("mark settled", e))?;

    Ok((result, new_balance))
}
