//! Approved fund-to-strategy capital allocations.

use super::decimal::Decimal;
use super::primitives::{AccountId, FundId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle status of an allocation, managed by an external approval
/// workflow. At most one allocation per fund is Active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    PendingApproval,
    Active,
    Archived,
}

/// The slice of a fund's ACTIVE allocation that applies to one strategy,
/// as resolved by the allocation provider for an incoming signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAllocation {
    pub allocation_id: String,
    pub fund_id: FundId,
    /// Percentage of fund equity allocated to the strategy (0..=100).
    pub weight_pct: Decimal,
    /// Accounts the strategy may use; None means every fund account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_accounts: Option<HashSet<AccountId>>,
}

impl ActiveAllocation {
    /// True if the strategy may route capital to this account.
    pub fn permits_account(&self, account_id: &AccountId) -> bool {
        match &self.allowed_accounts {
            Some(allowed) => allowed.contains(account_id),
            None => true,
        }
    }
}
