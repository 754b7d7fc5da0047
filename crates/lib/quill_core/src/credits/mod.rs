//! Credit ledger — remaining AI-action allowance per user.
//!
//! All reads and writes of the counter go through [`CreditLedger`]. Spending
//! a credit is a single atomic [`CreditLedger::debit`]; callers never compute
//! `current - 1` themselves and write it back, so concurrent sessions of the
//! same user cannot both spend from the same stale balance.
//!
//! Implementations:
//!
//! - [`postgres::PgCreditLedger`] — `ai_credits` table, conditional `UPDATE`
//! - [`memory::MemoryCreditLedger`] — in-process map for tests and local runs

pub mod memory;
pub mod postgres;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::credits::CreditAccount;

pub use memory::MemoryCreditLedger;
pub use postgres::PgCreditLedger;

/// Allowance granted to an account the first time it is seen.
pub const DEFAULT_ALLOWANCE: i64 = 25;

/// Response header carrying the balance left after a completion's debit.
pub const CREDITS_REMAINING_HEADER: &str = "x-ai-credits-remaining";

/// Credit ledger errors.
#[derive(Debug, Error)]
pub enum CreditError {
    #[error("No AI actions remaining")]
    Exhausted,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ledger unavailable: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Storage for per-user AI-action allowances.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance, or `None` when the user has no record yet.
    async fn read(&self, owner_id: &str) -> Result<Option<i64>, CreditError>;

    /// Overwrite the balance (plan grants). Creates the record if missing.
    async fn write(&self, owner_id: &str, remaining_actions: i64) -> Result<(), CreditError>;

    /// Return the account, creating it with [`DEFAULT_ALLOWANCE`] if absent.
    async fn ensure(&self, owner_id: &str, email: &str) -> Result<CreditAccount, CreditError>;

    /// Atomically spend one credit, returning the balance left afterwards.
    ///
    /// Fails with [`CreditError::Exhausted`] without touching the balance
    /// when it is already zero. A missing record is created first.
    async fn debit(&self, owner_id: &str) -> Result<i64, CreditError>;

    /// Whether the backing store answers.
    async fn is_reachable(&self) -> bool;
}

/// Reject balances the ledger must never hold.
pub(crate) fn validate_balance(remaining_actions: i64) -> Result<(), CreditError> {
    if remaining_actions < 0 {
        return Err(CreditError::Validation(format!(
            "remaining actions must be non-negative, got {remaining_actions}"
        )));
    }
    Ok(())
}

/// Subscription tiers and the monthly allowance each one grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Premium,
}

impl PlanTier {
    /// Credits granted per billing period.
    pub const fn allowance(self) -> i64 {
        match self {
            PlanTier::Free => 50,
            PlanTier::Pro => 150,
            PlanTier::Premium => 300,
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Premium => "premium",
        })
    }
}

impl FromStr for PlanTier {
    type Err = CreditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "premium" => Ok(PlanTier::Premium),
            other => Err(CreditError::Validation(format!("unknown plan: {other}"))),
        }
    }
}
