//! Postgres-backed credit ledger (`ai_credits` table).

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{CreditError, CreditLedger, DEFAULT_ALLOWANCE, validate_balance};
use crate::models::credits::CreditAccount;

/// Credit ledger stored in Postgres.
#[derive(Debug, Clone)]
pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a default account without an email unless one exists.
    async fn create_if_missing(&self, owner_id: &str) -> Result<(), CreditError> {
        sqlx::query(
            "INSERT INTO ai_credits (owner_id, email, remaining_actions) VALUES ($1, $2, $3) \
             ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(owner_id)
        .bind("")
        .bind(DEFAULT_ALLOWANCE)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn read(&self, owner_id: &str) -> Result<Option<i64>, CreditError> {
        let remaining = sqlx::query_scalar::<_, i64>(
            "SELECT remaining_actions FROM ai_credits WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining)
    }

    async fn write(&self, owner_id: &str, remaining_actions: i64) -> Result<(), CreditError> {
        validate_balance(remaining_actions)?;
        sqlx::query(
            "INSERT INTO ai_credits (owner_id, remaining_actions) VALUES ($1, $2) \
             ON CONFLICT (owner_id) DO UPDATE \
             SET remaining_actions = EXCLUDED.remaining_actions, updated_at = now()",
        )
        .bind(owner_id)
        .bind(remaining_actions)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ensure(&self, owner_id: &str, email: &str) -> Result<CreditAccount, CreditError> {
        // A record created by `debit` has no email yet; fill it in once.
        sqlx::query(
            "INSERT INTO ai_credits (owner_id, email, remaining_actions) VALUES ($1, $2, $3) \
             ON CONFLICT (owner_id) DO UPDATE SET email = EXCLUDED.email, updated_at = now() \
             WHERE ai_credits.email = '' AND EXCLUDED.email <> ''",
        )
        .bind(owner_id)
        .bind(email)
        .bind(DEFAULT_ALLOWANCE)
        .execute(&self.pool)
        .await?;
        let account = sqlx::query_as::<_, CreditAccount>(
            "SELECT owner_id, email, remaining_actions, updated_at \
             FROM ai_credits WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn debit(&self, owner_id: &str) -> Result<i64, CreditError> {
        self.create_if_missing(owner_id).await?;
        // Conditional decrement: zero rows means the balance was already 0.
        let remaining = sqlx::query_scalar::<_, i64>(
            "UPDATE ai_credits \
             SET remaining_actions = remaining_actions - 1, updated_at = now() \
             WHERE owner_id = $1 AND remaining_actions > 0 \
             RETURNING remaining_actions",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(left) => {
                debug!(owner_id, remaining = left, "credit debited");
                Ok(left)
            }
            None => Err(CreditError::Exhausted),
        }
    }

    async fn is_reachable(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
