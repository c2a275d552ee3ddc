//! In-memory providers for tests and local runs.

use super::{AccountDataProvider, AllocationProvider, ProviderError};
use crate::domain::{ActiveAllocation, FundId, FundState, StrategyId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Serves canned fund states; can fail transiently a fixed number of
/// times before succeeding, for retry tests.
#[derive(Debug, Default)]
pub struct MockAccountDataProvider {
    funds: HashMap<FundId, FundState>,
    transient_failures: AtomicU32,
    call_count: AtomicU32,
}

impl MockAccountDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fund(mut self, fund: FundState) -> Self {
        self.funds.insert(fund.fund_id.clone(), fund);
        self
    }

    /// Fail the first `count` calls with a transient network error.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountDataProvider for MockAccountDataProvider {
    async fn get_fund_state(&self, fund_id: &FundId) -> Result<FundState, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::NetworkError(
                "injected transient failure".to_string(),
            ));
        }
        self.funds
            .get(fund_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("fund {}", fund_id)))
    }
}

/// Serves canned active allocations per strategy.
#[derive(Debug, Default)]
pub struct MockAllocationProvider {
    allocations: HashMap<StrategyId, Vec<ActiveAllocation>>,
    fail: bool,
}

impl MockAllocationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocation(mut self, strategy_id: StrategyId, allocation: ActiveAllocation) -> Self {
        self.allocations
            .entry(strategy_id)
            .or_default()
            .push(allocation);
        self
    }

    pub fn failing() -> Self {
        MockAllocationProvider {
            allocations: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl AllocationProvider for MockAllocationProvider {
    async fn get_active_allocations(
        &self,
        strategy_id: &StrategyId,
    ) -> Result<Vec<ActiveAllocation>, ProviderError> {
        if self.fail {
            return Err(ProviderError::NetworkError(
                "injected allocation failure".to_string(),
            ));
        }
        Ok(self
            .allocations
            .get(strategy_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, FundStatus};

    fn fund(id: &str) -> FundState {
        FundState {
            fund_id: FundId::new(id),
            total_equity: Decimal::from_i64(100000),
            status: FundStatus::Active,
            accounts: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_account_provider_serves_funds() {
        let provider = MockAccountDataProvider::new().with_fund(fund("fund-1"));
        let state = provider.get_fund_state(&FundId::new("fund-1")).await.unwrap();
        assert_eq!(state.fund_id, FundId::new("fund-1"));

        let missing = provider.get_fund_state(&FundId::new("fund-2")).await;
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let provider = MockAccountDataProvider::new()
            .with_fund(fund("fund-1"))
            .with_transient_failures(2);

        assert!(provider.get_fund_state(&FundId::new("fund-1")).await.is_err());
        assert!(provider.get_fund_state(&FundId::new("fund-1")).await.is_err());
        assert!(provider.get_fund_state(&FundId::new("fund-1")).await.is_ok());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_allocation_provider_empty_by_default() {
        let provider = MockAllocationProvider::new();
        let allocations = provider
            .get_active_allocations(&StrategyId::new("momentum"))
            .await
            .unwrap();
        assert!(allocations.is_empty());
    }
}
