//! Per-(fund, strategy) async locks.
//!
//! One signal's ledger read and order append for a given (fund, strategy)
//! must not interleave with another signal's; funds stay independent, so
//! each pair gets its own lock and cross-fund work runs concurrently.

use crate::domain::{FundId, StrategyId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct FundStrategyLocks {
    inner: Arc<StdMutex<HashMap<(FundId, StrategyId), Arc<Mutex<()>>>>>,
}

impl FundStrategyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for (fund, strategy), creating it on first use.
    /// The guard is owned so it can outlive the lock map borrow.
    pub async fn acquire(
        &self,
        fund_id: &FundId,
        strategy_id: &StrategyId,
    ) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            map.entry((fund_id.clone(), strategy_id.clone()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}
