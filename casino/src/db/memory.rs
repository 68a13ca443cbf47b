//! In-memory `AccountStore` for tests and database-less runs.
//!
//! A unit of work takes the store's async mutex for its whole lifetime and
//! edits a private copy of the state. Commit swaps the copy in; dropping the
//! unit of work throws it away. Failures can be injected at any step with
//! [`MemoryAccountStore::fail_at`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex as StdMutex, PoisonError},
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::repository::{AccountStore, UnitOfWork};
use crate::wallet::{
    AccountId, BetRecord, DailyStats, RoundRecord, RoundStatus, WalletError, WalletResult,
};

/// Step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    Lock,
    Update,
    Verify,
    History,
    Commit,
    Stats,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    balances: HashMap<AccountId, i64>,
    rounds: HashMap<Uuid, RoundRecord>,
    bets: Vec<BetRecord>,
    stats: BTreeMap<(AccountId, NaiveDate), DailyStats>,
}

type FailSlot = Arc<StdMutex<Option<FailPoint>>>;

fn check(slot: &FailSlot, point: FailPoint) -> WalletResult<()> {
    let armed = *slot.lock().unwrap_or_else(PoisonError::into_inner);
    if armed == Some(point) {
        return Err(WalletError::Concurrency(format!(
            "injected failure at {point:?}"
        )));
    }
    Ok(())
}

fn to_take(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    state: Arc<Mutex<MemoryState>>,
    fail_point: FailSlot,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `(account_id, balance)` pairs.
    pub fn with_accounts(accounts: impl IntoIterator<Item = (AccountId, i64)>) -> Self {
        let state = MemoryState {
            balances: accounts.into_iter().collect(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_point: FailSlot::default(),
        }
    }

    /// Create or overwrite an account's balance.
    pub async fn set_balance(&self, account_id: AccountId, balance: i64) {
        self.state.lock().await.balances.insert(account_id, balance);
    }

    pub async fn round(&self, round_id: Uuid) -> Option<RoundRecord> {
        self.state.lock().await.rounds.get(&round_id).cloned()
    }

    /// Make every later step of kind `point` fail until cleared.
    pub fn fail_at(&self, point: FailPoint) {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    pub fn clear_fail_point(&self) {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn begin(&self) -> WalletResult<Box<dyn UnitOfWork>> {
        check(&self.fail_point, FailPoint::Begin)?;

        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_point: Arc::clone(&self.fail_point),
        }))
    }

    async fn balance(&self, account_id: AccountId) -> WalletResult<Option<i64>> {
        Ok(self.state.lock().await.balances.get(&account_id).copied())
    }

    async fn bet_history(&self, account_id: AccountId, limit: i64) -> WalletResult<Vec<BetRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .bets
            .iter()
            .rev()
            .filter(|bet| bet.account_id == account_id)
            .take(to_take(limit))
            .cloned()
            .collect())
    }

    async fn round_bets(&self, round_id: Uuid) -> WalletResult<Vec<BetRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .bets
            .iter()
            .filter(|bet| bet.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn record_game(
        &self,
        account_id: AccountId,
        day: NaiveDate,
        won: bool,
    ) -> WalletResult<()> {
        check(&self.fail_point, FailPoint::Stats)?;

        let mut state = self.state.lock().await;
        let stats = state
            .stats
            .entry((account_id, day))
            .or_insert_with(|| DailyStats {
                account_id,
                day,
                games_played: 0,
                games_won: 0,
            });
        stats.games_played += 1;
        if won {
            stats.games_won += 1;
        }
        Ok(())
    }

    async fn daily_stats(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> WalletResult<Vec<DailyStats>> {
        let state = self.state.lock().await;
        Ok(state
            .stats
            .range((account_id, NaiveDate::MIN)..=(account_id, NaiveDate::MAX))
            .rev()
            .take(to_take(limit))
            .map(|(_, stats)| stats.clone())
            .collect())
    }

    async fn health_check(&self) -> WalletResult<()> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_point: FailSlot,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_balance(&mut self, account_id: AccountId) -> WalletResult<Option<i64>> {
        check(&self.fail_point, FailPoint::Lock)?;
        Ok(self.working.balances.get(&account_id).copied())
    }

    async fn update_balance(
        &mut self,
        account_id: AccountId,
        new_balance: i64,
    ) -> WalletResult<()> {
        check(&self.fail_point, FailPoint::Update)?;

        if new_balance < 0 {
            return Err(WalletError::InvalidAmount(format!(
                "balance {new_balance} violates the non-negative constraint"
            )));
        }
        let balance = self
            .working
            .balances
            .get_mut(&account_id)
            .ok_or(WalletError::AccountNotFound(account_id))?;
        *balance = new_balance;
        Ok(())
    }

    async fn read_balance(&mut self, account_id: AccountId) -> WalletResult<Option<i64>> {
        check(&self.fail_point, FailPoint::Verify)?;
        Ok(self.working.balances.get(&account_id).copied())
    }

    async fn insert_round(&mut self, round: &RoundRecord) -> WalletResult<()> {
        if self.working.rounds.contains_key(&round.round_id) {
            return Err(WalletError::Validation(format!(
                "round {} already exists",
                round.round_id
            )));
        }
        self.working.rounds.insert(round.round_id, round.clone());
        Ok(())
    }

    async fn lock_round(&mut self, round_id: Uuid) -> WalletResult<Option<RoundRecord>> {
        check(&self.fail_point, FailPoint::Lock)?;
        Ok(self.working.rounds.get(&round_id).cloned())
    }

    async fn committed_bets(&mut self, round_id: Uuid) -> WalletResult<Vec<BetRecord>> {
        Ok(self
            .working
            .bets
            .iter()
            .filter(|bet| bet.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn mark_round_settled(
        &mut self,
        round_id: Uuid,
        settled_at: DateTime<Utc>,
    ) -> WalletResult<()> {
        let round = self
            .working
            .rounds
            .get_mut(&round_id)
            .ok_or(WalletError::RoundNotFound(round_id))?;
        if round.status != RoundStatus::Pending {
            return Err(WalletError::RoundAlreadySettled(round_id));
        }
        round.status = RoundStatus::Settled;
        round.settled_at = Some(settled_at);
        Ok(())
    }

    async fn insert_bets(&mut self, bets: &[BetRecord]) -> WalletResult<()> {
        check(&self.fail_point, FailPoint::History)?;
        self.working.bets.extend_from_slice(bets);
        Ok(())
    }

    async fn record_outcomes(&mut self, bets: &[BetRecord]) -> WalletResult<()> {
        check(&self.fail_point, FailPoint::History)?;

        for bet in bets {
            let stored = self
                .working
                .bets
                .iter_mut()
                .find(|stored| stored.round_id == bet.round_id && stored.cell_key == bet.cell_key)
                .ok_or_else(|| {
                    WalletError::Concurrency(format!("no committed bet on {}", bet.cell_key))
                })?;
            stored.won = bet.won;
            stored.win_amount = bet.win_amount;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> WalletResult<()> {
        check(&self.fail_point, FailPoint::Commit)?;

        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> WalletResult<()> {
        Ok(())
    }
}
