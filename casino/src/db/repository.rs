//! Repository trait definitions for testability and dependency injection.
//!
//! [`AccountStore`] is everything the reconciler needs from persistent
//! storage. Balance changes only happen through a [`UnitOfWork`]: commit
//! consumes it, and dropping it without commit rolls everything back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::time::Duration;
use uuid::Uuid;

use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use crate::roulette::BetType;
use crate::wallet::{
    AccountId, BetRecord, DailyStats, RoundRecord, RoundStatus, WalletError, WalletResult,
};

/// Trait for the authoritative account store
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Start a unit of work
    async fn begin(&self) -> WalletResult<Box<dyn UnitOfWork>>;

    /// Current balance, `None` if the account has no balance row
    async fn balance(&self, account_id: AccountId) -> WalletResult<Option<i64>>;

    /// Most recent bets of an account, newest first
    async fn bet_history(&self, account_id: AccountId, limit: i64) -> WalletResult<Vec<BetRecord>>;

    /// Bets of one round, in insertion order
    async fn round_bets(&self, round_id: Uuid) -> WalletResult<Vec<BetRecord>>;

    /// Count one game for the account on `day`
    async fn record_game(&self, account_id: AccountId, day: NaiveDate, won: bool)
    -> WalletResult<()>;

    /// Most recent daily stats of an account, newest day first
    async fn daily_stats(&self, account_id: AccountId, limit: i64)
    -> WalletResult<Vec<DailyStats>>;

    /// Check the store is reachable
    async fn health_check(&self) -> WalletResult<()>;
}

/// One transaction against the store
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read and lock the account's balance row
    async fn lock_balance(&mut self, account_id: AccountId) -> WalletResult<Option<i64>>;

    /// Overwrite the balance of a locked account
    async fn update_balance(&mut self, account_id: AccountId, new_balance: i64)
    -> WalletResult<()>;

    /// Read the balance as this unit of work currently sees it
    async fn read_balance(&mut self, account_id: AccountId) -> WalletResult<Option<i64>>;

    /// Register a freshly spun round
    async fn insert_round(&mut self, round: &RoundRecord) -> WalletResult<()>;

    /// Read and lock a round
    async fn lock_round(&mut self, round_id: Uuid) -> WalletResult<Option<RoundRecord>>;

    /// Bets committed for a round, in insertion order
    async fn committed_bets(&mut self, round_id: Uuid) -> WalletResult<Vec<BetRecord>>;

    /// Flip a locked pending round to settled
    async fn mark_round_settled(
        &mut self,
        round_id: Uuid,
        settled_at: DateTime<Utc>,
    ) -> WalletResult<()>;

    /// Append bet history rows
    async fn insert_bets(&mut self, bets: &[BetRecord]) -> WalletResult<()>;

    /// Store `won` and `win_amount` of already inserted bets, matched by
    /// round and cell key
    async fn record_outcomes(&mut self, bets: &[BetRecord]) -> WalletResult<()>;

    /// Make every change visible
    async fn commit(self: Box<Self>) -> WalletResult<()>;

    /// Discard every change
    async fn rollback(self: Box<Self>) -> WalletResult<()>;
}

fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> WalletError {
    WalletError::Database(sqlx::Error::Decode(Box::new(err)))
}

fn balance_from_row(row: &PgRow) -> WalletResult<i64> {
    row.try_get::<i64, _>("balance")
        .map_err(|e| WalletError::InvalidAmount(format!("stored balance is unreadable: {e}")))
}

fn round_from_row(row: &PgRow) -> WalletResult<RoundRecord> {
    let status: String = row.try_get("status")?;
    let winning_number: i16 = row.try_get("winning_number")?;

    Ok(RoundRecord {
        round_id: row.try_get("round_id")?,
        account_id: row.try_get("account_id")?,
        winning_number: u8::try_from(winning_number).map_err(decode_error)?,
        total_stake: row.try_get("total_stake")?,
        status: status
            .parse::<RoundStatus>()
            .map_err(|e| decode_error(std::io::Error::other(e)))?,
        created_at: row.try_get("created_at")?,
        settled_at: row.try_get("settled_at")?,
    })
}

fn bet_from_row(row: &PgRow) -> WalletResult<BetRecord> {
    let bet_type: String = row.try_get("bet_type")?;
    let numbers: Vec<i32> = row.try_get("numbers")?;
    let odds: i32 = row.try_get("odds")?;

    Ok(BetRecord {
        round_id: row.try_get("round_id")?,
        account_id: row.try_get("account_id")?,
        cell_key: row.try_get("cell_key")?,
        label: row.try_get("label")?,
        bet_type: bet_type.parse::<BetType>().map_err(decode_error)?,
        numbers: numbers
            .into_iter()
            .map(u8::try_from)
            .collect::<Result<Vec<u8>, _>>()
            .map_err(decode_error)?,
        amount: row.try_get("amount")?,
        odds: u32::try_from(odds).map_err(decode_error)?,
        won: row.try_get("won")?,
        win_amount: row.try_get("win_amount")?,
        created_at: row.try_get("created_at")?,
    })
}

const ROUND_COLUMNS: &str =
    "round_id, account_id, winning_number, total_stake, status, created_at, settled_at";

const BET_COLUMNS: &str = "round_id, account_id, cell_key, label, bet_type, numbers, amount, \
                           odds, won, win_amount, created_at";

/// Default PostgreSQL implementation of `AccountStore`
///
/// Every statement is bounded by the transaction timeout; a timeout surfaces
/// as [`WalletError::Concurrency`].
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_TRANSACTION_TIMEOUT)
    }

    pub fn with_timeout(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn begin(&self) -> WalletResult<Box<dyn UnitOfWork>> {
        let tx = with_timeout(self.timeout, self.pool.begin()).await?;
        Ok(Box::new(PgUnitOfWork {
            tx,
            timeout: self.timeout,
        }))
    }

    async fn balance(&self, account_id: AccountId) -> WalletResult<Option<i64>> {
        let row = with_timeout(
            self.timeout,
            sqlx::query("SELECT balance FROM account_balances WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(balance_from_row).transpose()
    }

    async fn bet_history(&self, account_id: AccountId, limit: i64) -> WalletResult<Vec<BetRecord>> {
        let sql = format!(
            "SELECT {BET_COLUMNS} FROM roulette_bets
             WHERE account_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        let rows = with_timeout(
            self.timeout,
            sqlx::query(&sql)
                .bind(account_id)
                .bind(limit)
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    async fn round_bets(&self, round_id: Uuid) -> WalletResult<Vec<BetRecord>> {
        let sql =
            format!("SELECT {BET_COLUMNS} FROM roulette_bets WHERE round_id = $1 ORDER BY id");
        let rows = with_timeout(
            self.timeout,
            sqlx::query(&sql).bind(round_id).fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    async fn record_game(
        &self,
        account_id: AccountId,
        day: NaiveDate,
        won: bool,
    ) -> WalletResult<()> {
        with_timeout(
            self.timeout,
            sqlx::query(
                "INSERT INTO roulette_stats (account_id, day, num_games, num_wins)
                 VALUES ($1, $2, 1, $3)
                 ON CONFLICT (account_id, day) DO UPDATE
                 SET num_games = roulette_stats.num_games + 1,
                     num_wins = roulette_stats.num_wins + EXCLUDED.num_wins",
            )
            .bind(account_id)
            .bind(day)
            .bind(i64::from(won))
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn daily_stats(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> WalletResult<Vec<DailyStats>> {
        let rows = with_timeout(
            self.timeout,
            sqlx::query(
                "SELECT account_id, day, num_games, num_wins FROM roulette_stats
                 WHERE account_id = $1
                 ORDER BY day DESC
                 LIMIT $2",
            )
            .bind(account_id)
            .bind(limit)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|r| -> WalletResult<DailyStats> {
                Ok(DailyStats {
                    account_id: r.try_get("account_id")?,
                    day: r.try_get("day")?,
                    games_played: r.try_get("num_games")?,
                    games_won: r.try_get("num_wins")?,
                })
            })
            .collect()
    }

    async fn health_check(&self) -> WalletResult<()> {
        with_timeout(self.timeout, sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

/// PostgreSQL unit of work: one open transaction
///
/// Dropping it without [`UnitOfWork::commit`] lets sqlx roll the
/// transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    timeout: Duration,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_balance(&mut self, account_id: AccountId) -> WalletResult<Option<i64>> {
        let row = with_timeout(
            self.timeout,
            sqlx::query("SELECT balance FROM account_balances WHERE account_id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(balance_from_row).transpose()
    }

    async fn update_balance(
        &mut self,
        account_id: AccountId,
        new_balance: i64,
    ) -> WalletResult<()> {
        let result = with_timeout(
            self.timeout,
            sqlx::query(
                "UPDATE account_balances SET balance = $1, updated_at = NOW()
                 WHERE account_id = $2",
            )
            .bind(new_balance)
            .bind(account_id)
            .execute(&mut *self.tx),
        )
        .await?;

        if result.rows_affected() != 1 {
            return Err(WalletError::Concurrency(format!(
                "balance update touched {} rows",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn read_balance(&mut self, account_id: AccountId) -> WalletResult<Option<i64>> {
        let row = with_timeout(
            self.timeout,
            sqlx::query("SELECT balance FROM account_balances WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(balance_from_row).transpose()
    }

    async fn insert_round(&mut self, round: &RoundRecord) -> WalletResult<()> {
        let sql = format!(
            "INSERT INTO roulette_rounds ({ROUND_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        with_timeout(
            self.timeout,
            sqlx::query(&sql)
                .bind(round.round_id)
                .bind(round.account_id)
                .bind(i16::from(round.winning_number))
                .bind(round.total_stake)
                .bind(round.status.as_str())
                .bind(round.created_at)
                .bind(round.settled_at)
                .execute(&mut *self.tx),
        )
        .await?;
        Ok(())
    }

    async fn lock_round(&mut self, round_id: Uuid) -> WalletResult<Option<RoundRecord>> {
        let sql =
            format!("SELECT {ROUND_COLUMNS} FROM roulette_rounds WHERE round_id = $1 FOR UPDATE");
        let row = with_timeout(
            self.timeout,
            sqlx::query(&sql)
                .bind(round_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(round_from_row).transpose()
    }

    async fn committed_bets(&mut self, round_id: Uuid) -> WalletResult<Vec<BetRecord>> {
        let sql =
            format!("SELECT {BET_COLUMNS} FROM roulette_bets WHERE round_id = $1 ORDER BY id");
        let rows = with_timeout(
            self.timeout,
            sqlx::query(&sql).bind(round_id).fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    async fn mark_round_settled(
        &mut self,
        round_id: Uuid,
        settled_at: DateTime<Utc>,
    ) -> WalletResult<()> {
        let result = with_timeout(
            self.timeout,
            sqlx::query(
                "UPDATE roulette_rounds SET status = 'settled', settled_at = $2
                 WHERE round_id = $1 AND status = 'pending'",
            )
            .bind(round_id)
            .bind(settled_at)
            .execute(&mut *self.tx),
        )
        .await?;

        if result.rows_affected() != 1 {
            return Err(WalletError::RoundAlreadySettled(round_id));
        }
        Ok(())
    }

    async fn insert_bets(&mut self, bets: &[BetRecord]) -> WalletResult<()> {
        let sql = format!(
            "INSERT INTO roulette_bets ({BET_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        for bet in bets {
            let numbers: Vec<i32> = bet.numbers.iter().map(|&n| i32::from(n)).collect();
            let odds = i32::try_from(bet.odds).map_err(|_| {
                WalletError::InvalidAmount(format!("odds {} out of range", bet.odds))
            })?;

            with_timeout(
                self.timeout,
                sqlx::query(&sql)
                    .bind(bet.round_id)
                    .bind(bet.account_id)
                    .bind(&bet.cell_key)
                    .bind(&bet.label)
                    .bind(bet.bet_type.to_string())
                    .bind(numbers)
                    .bind(bet.amount)
                    .bind(odds)
                    .bind(bet.won)
                    .bind(bet.win_amount)
                    .bind(bet.created_at)
                    .execute(&mut *self.tx),
            )
            .await?;
        }
        Ok(())
    }

    async fn record_outcomes(&mut self, bets: &[BetRecord]) -> WalletResult<()> {
        for bet in bets {
            let result = with_timeout(
                self.timeout,
                sqlx::query(
                    "UPDATE roulette_bets SET won = $3, win_amount = $4
                     WHERE round_id = $1 AND cell_key = $2",
                )
                .bind(bet.round_id)
                .bind(&bet.cell_key)
                .bind(bet.won)
                .bind(bet.win_amount)
                .execute(&mut *self.tx),
            )
            .await?;

            if result.rows_affected() != 1 {
                return Err(WalletError::Concurrency(format!(
                    "outcome of {} touched {} rows",
                    bet.cell_key,
                    result.rows_affected()
                )));
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> WalletResult<()> {
        let this = *self;
        with_timeout(this.timeout, this.tx.commit()).await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> WalletResult<()> {
        let this = *self;
        with_timeout(this.timeout, this.tx.rollback()).await?;
        Ok(())
    }
}
