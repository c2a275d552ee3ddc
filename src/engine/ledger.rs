//! Capital ledger: allocated / used / available per (fund, strategy).
//!
//! Read-only aggregation. The order store is the source of truth for
//! `used`; the active allocation weight and fund equity arrive fresh from
//! their providers on every signal, never cached across signals.

use crate::db::Repository;
use crate::domain::{Decimal, FundId, StrategyId};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Snapshot of a strategy's capital within one fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapitalSnapshot {
    /// fund equity × weight / 100.
    pub allocated: Decimal,
    /// Σ notional of pending/submitted/filled orders not yet closed.
    pub used: Decimal,
    /// allocated − used, floored at zero.
    pub available: Decimal,
}

pub struct CapitalLedger {
    repo: Arc<Repository>,
}

impl CapitalLedger {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Compute the capital snapshot for (fund, strategy) at the given
    /// equity and ACTIVE allocation weight.
    ///
    /// # Errors
    /// Propagates repository failures; callers treat them as fatal
    /// persistence errors, not rejections.
    pub async fn available_capital(
        &self,
        fund_id: &FundId,
        strategy_id: &StrategyId,
        total_equity: Decimal,
        weight_pct: Decimal,
    ) -> Result<CapitalSnapshot, sqlx::Error> {
        let allocated = total_equity * weight_pct / Decimal::hundred();
        let used = self.repo.open_notional(fund_id, strategy_id).await?;
        let available = (allocated - used).max(Decimal::zero());

        debug!(
            fund = %fund_id,
            strategy = %strategy_id,
            allocated = %allocated,
            used = %used,
            available = %available,
            "capital snapshot"
        );

        Ok(CapitalSnapshot {
            allocated,
            used,
            available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{
        AccountId, Decimal, FundId, Instrument, Order, OrderSide, OrderStatus, SignalId,
        StrategyId,
    };
    use tempfile::TempDir;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    async fn setup() -> (CapitalLedger, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        (CapitalLedger::new(repo.clone()), repo, temp_dir)
    }

    fn order(fund: &str, strategy: &str, notional: &str, status: OrderStatus) -> Order {
        let quantity = d(notional);
        let mut order = Order::new(
            SignalId::new(format!("sig-{}", uuid::Uuid::new_v4())),
            FundId::new(fund),
            AccountId::new("acct-1"),
            StrategyId::new(strategy),
            Instrument::new("AAPL"),
            OrderSide::Buy,
            quantity,
            Decimal::one(),
        );
        order.status = status;
        order
    }

    #[tokio::test]
    async fn test_allocated_from_equity_and_weight() {
        let (ledger, _repo, _temp) = setup().await;
        let snapshot = ledger
            .available_capital(
                &FundId::new("fund-1"),
                &StrategyId::new("momentum"),
                d("750000"),
                d("10"),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.allocated, d("75000"));
        assert_eq!(snapshot.used, Decimal::zero());
        assert_eq!(snapshot.available, d("75000"));
    }

    #[tokio::test]
    async fn test_used_counts_open_orders_only() {
        let (ledger, repo, _temp) = setup().await;
        let fund = FundId::new("fund-1");
        let strategy = StrategyId::new("momentum");

        repo.insert_order(&order("fund-1", "momentum", "25000", OrderStatus::Submitted))
            .await
            .unwrap();
        repo.insert_order(&order("fund-1", "momentum", "5000", OrderStatus::Cancelled))
            .await
            .unwrap();
        repo.insert_order(&order("fund-1", "other", "9000", OrderStatus::Filled))
            .await
            .unwrap();

        let snapshot = ledger
            .available_capital(&fund, &strategy, d("750000"), d("10"))
            .await
            .unwrap();

        assert_eq!(snapshot.used, d("25000"));
        assert_eq!(snapshot.available, d("50000"));
    }

    #[tokio::test]
    async fn test_available_floored_at_zero() {
        let (ledger, repo, _temp) = setup().await;

        repo.insert_order(&order("fund-1", "momentum", "90000", OrderStatus::Filled))
            .await
            .unwrap();

        let snapshot = ledger
            .available_capital(
                &FundId::new("fund-1"),
                &StrategyId::new("momentum"),
                d("750000"),
                d("10"),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.available, Decimal::zero());
    }
}
