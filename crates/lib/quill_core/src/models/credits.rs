//! Credit ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row stored in `ai_credits`: one user's remaining AI-action allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CreditAccount {
    pub owner_id: String,
    pub email: String,
    pub remaining_actions: i64,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// A fresh account holding `remaining_actions` credits.
    pub fn new(owner_id: &str, email: &str, remaining_actions: i64) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            email: email.to_string(),
            remaining_actions,
            updated_at: Utc::now(),
        }
    }
}
