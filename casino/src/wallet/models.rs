//! Wallet data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::roulette::{BetType, Wager, WagerOutcome};

/// Account ID type
pub type AccountId = i64;

/// Authoritative balance as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: i64,
}

/// Round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Settled,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Settled => "settled",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RoundStatus::Pending),
            "settled" => Ok(RoundStatus::Settled),
            other => Err(format!("unknown round status {other:?}")),
        }
    }
}

/// One spin registered for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round_id: Uuid,
    pub account_id: AccountId,
    pub winning_number: u8,
    /// Sum of the wagers committed at spin time, already debited
    pub total_stake: i64,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl RoundRecord {
    /// A fresh pending round.
    pub fn pending(account_id: AccountId, winning_number: u8, total_stake: i64) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            account_id,
            winning_number,
            total_stake,
            status: RoundStatus::Pending,
            created_at: Utc::now(),
            settled_at: None,
        }
    }
}

/// A round whose wagers are committed and whose stake is debited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedRound {
    pub round: RoundRecord,
    /// Balance after the stake was taken out
    pub balance: i64,
}

/// Bet history row
///
/// Written when the round is opened; `won` and `win_amount` stay unset until
/// the round is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    pub round_id: Uuid,
    pub account_id: AccountId,
    /// `CellKey` display form, e.g. `split:1,2`
    pub cell_key: String,
    pub label: String,
    pub bet_type: BetType,
    pub numbers: Vec<u8>,
    pub amount: i64,
    pub odds: u32,
    pub won: bool,
    pub win_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl BetRecord {
    /// Row for a wager committed before the wheel is revealed.
    pub fn committed(
        round_id: Uuid,
        account_id: AccountId,
        wager: &Wager,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            round_id,
            account_id,
            cell_key: wager.key().to_string(),
            label: wager.label().to_string(),
            bet_type: wager.bet_type(),
            numbers: wager.cell.numbers.iter().copied().collect(),
            amount: wager.amount,
            odds: wager.odds(),
            won: false,
            win_amount: 0,
            created_at,
        }
    }

    pub fn from_outcome(
        round_id: Uuid,
        account_id: AccountId,
        outcome: &WagerOutcome,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            won: outcome.won,
            win_amount: outcome.win_amount,
            ..Self::committed(round_id, account_id, &outcome.wager, created_at)
        }
    }
}

/// Games played and won by an account on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub account_id: AccountId,
    pub day: NaiveDate,
    pub games_played: i64,
    pub games_won: i64,
}

/// What a committed settlement did to the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledRound {
    pub round_id: Uuid,
    pub account_id: AccountId,
    pub winning_number: u8,
    pub total_win: i64,
    pub total_stake: i64,
    /// Stake plus profit of every winning wager
    pub net_payout: i64,
    pub new_balance: i64,
    pub settled_at: DateTime<Utc>,
}

impl SettledRound {
    /// The payout exceeded the stake.
    pub fn is_win(&self) -> bool {
        self.net_payout > self.total_stake
    }
}
