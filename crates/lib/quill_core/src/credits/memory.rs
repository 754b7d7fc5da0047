//! In-memory credit ledger.
//!
//! Each account sits behind its map shard's write lock for the duration of
//! a debit, which gives the same check-and-decrement atomicity as the
//! conditional `UPDATE` in Postgres.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{CreditError, CreditLedger, DEFAULT_ALLOWANCE, validate_balance};
use crate::models::credits::CreditAccount;

/// Credit ledger held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCreditLedger {
    accounts: DashMap<String, CreditAccount>,
    unavailable: AtomicBool,
}

impl MemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with a given balance.
    pub fn with_account(self, owner_id: &str, remaining_actions: i64) -> Self {
        self.accounts.insert(
            owner_id.to_string(),
            CreditAccount::new(owner_id, "", remaining_actions),
        );
        self
    }

    /// Make every operation fail with [`CreditError::Store`] (outage simulation).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CreditError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CreditError::Store("memory ledger marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CreditLedger for MemoryCreditLedger {
    async fn read(&self, owner_id: &str) -> Result<Option<i64>, CreditError> {
        self.check_available()?;
        Ok(self.accounts.get(owner_id).map(|a| a.remaining_actions))
    }

    async fn write(&self, owner_id: &str, remaining_actions: i64) -> Result<(), CreditError> {
        self.check_available()?;
        validate_balance(remaining_actions)?;
        let mut account = self
            .accounts
            .entry(owner_id.to_string())
            .or_insert_with(|| CreditAccount::new(owner_id, "", remaining_actions));
        account.remaining_actions = remaining_actions;
        account.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn ensure(&self, owner_id: &str, email: &str) -> Result<CreditAccount, CreditError> {
        self.check_available()?;
        let mut account = self
            .accounts
            .entry(owner_id.to_string())
            .or_insert_with(|| CreditAccount::new(owner_id, email, DEFAULT_ALLOWANCE));
        if account.email.is_empty() && !email.is_empty() {
            account.email = email.to_string();
            account.updated_at = chrono::Utc::now();
        }
        Ok(account.clone())
    }

    async fn debit(&self, owner_id: &str) -> Result<i64, CreditError> {
        self.check_available()?;
        let mut account = self
            .accounts
            .entry(owner_id.to_string())
            .or_insert_with(|| CreditAccount::new(owner_id, "", DEFAULT_ALLOWANCE));
        if account.remaining_actions <= 0 {
            return Err(CreditError::Exhausted);
        }
        account.remaining_actions -= 1;
        account.updated_at = chrono::Utc::now();
        debug!(owner_id, remaining = account.remaining_actions, "credit debited");
        Ok(account.remaining_actions)
    }

    async fn is_reachable(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn read_missing_is_none() {
        let ledger = MemoryCreditLedger::new();
        assert_eq!(ledger.read("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ensure_creates_default_once() {
        let ledger = MemoryCreditLedger::new();
        let first = ledger.ensure("u1", "u1@example.com").await.unwrap();
        assert_eq!(first.remaining_actions, DEFAULT_ALLOWANCE);
        assert_eq!(first.email, "u1@example.com");

        ledger.debit("u1").await.unwrap();
        let again = ledger.ensure("u1", "u1@example.com").await.unwrap();
        assert_eq!(again.remaining_actions, DEFAULT_ALLOWANCE - 1);
    }

    #[tokio::test]
    async fn ensure_fills_in_email_left_blank_by_debit() {
        let ledger = MemoryCreditLedger::new();
        ledger.debit("u1").await.unwrap();

        let account = ledger.ensure("u1", "u1@example.com").await.unwrap();
        assert_eq!(account.email, "u1@example.com");
        assert_eq!(account.remaining_actions, DEFAULT_ALLOWANCE - 1);

        let again = ledger.ensure("u1", "other@example.com").await.unwrap();
        assert_eq!(again.email, "u1@example.com");
    }

    #[tokio::test]
    async fn debit_decrements_by_one() {
        let ledger = MemoryCreditLedger::new().with_account("u1", 3);
        assert_eq!(ledger.debit("u1").await.unwrap(), 2);
        assert_eq!(ledger.read("u1").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn debit_on_missing_record_starts_from_default() {
        let ledger = MemoryCreditLedger::new();
        assert_eq!(ledger.debit("fresh").await.unwrap(), DEFAULT_ALLOWANCE - 1);
    }

    #[tokio::test]
    async fn debit_at_zero_is_exhausted_and_leaves_balance() {
        let ledger = MemoryCreditLedger::new().with_account("u1", 0);
        assert!(matches!(
            ledger.debit("u1").await,
            Err(CreditError::Exhausted)
        ));
        assert_eq!(ledger.read("u1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn concurrent_debits_from_same_balance_both_count() {
        let ledger = Arc::new(MemoryCreditLedger::new().with_account("u1", 3));

        let a = tokio::spawn({
            let ledger = Arc::clone(&ledger);
            async move { ledger.debit("u1").await }
        });
        let b = tokio::spawn({
            let ledger = Arc::clone(&ledger);
            async move { ledger.debit("u1").await }
        });
        let mut results = vec![a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        results.sort();

        assert_eq!(results, vec![1, 2]);
        assert_eq!(ledger.read("u1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn balance_never_goes_negative_under_contention() {
        let ledger = Arc::new(MemoryCreditLedger::new().with_account("u1", 5));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move { ledger.debit("u1").await }));
        }
        let mut spent = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                spent += 1;
            }
        }
        assert_eq!(spent, 5);
        assert_eq!(ledger.read("u1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn write_overwrites_and_validates() {
        let ledger = MemoryCreditLedger::new().with_account("u1", 2);
        ledger.write("u1", 150).await.unwrap();
        assert_eq!(ledger.read("u1").await.unwrap(), Some(150));
        assert!(matches!(
            ledger.write("u1", -3).await,
            Err(CreditError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_ledger_fails_every_call() {
        let ledger = MemoryCreditLedger::new().with_account("u1", 2);
        ledger.set_unavailable(true);
        assert!(matches!(ledger.debit("u1").await, Err(CreditError::Store(_))));
        assert!(!ledger.is_reachable().await);
        ledger.set_unavailable(false);
        assert_eq!(ledger.debit("u1").await.unwrap(), 1);
    }
}
