//! Credit service — account lookup and plan grants.

use quill_core::credits::{CreditLedger, PlanTier};
use quill_core::models::credits::CreditAccount;
use tracing::info;

use crate::error::AppResult;

/// The caller's account, created with the default allowance on first use.
pub async fn account_for(
    ledger: &dyn CreditLedger,
    owner_id: &str,
    email: &str,
) -> AppResult<CreditAccount> {
    Ok(ledger.ensure(owner_id, email).await?)
}

/// Reset `owner_id`'s balance to the allowance of `plan`.
///
/// This is a blind overwrite; unspent credits from the previous period are
/// not carried over.
pub async fn grant_plan(
    ledger: &dyn CreditLedger,
    owner_id: &str,
    plan: PlanTier,
) -> AppResult<i64> {
    let allowance = plan.allowance();
    ledger.write(owner_id, allowance).await?;
    info!(owner_id, %plan, allowance, "plan allowance granted");
    Ok(allowance)
}
