//! Concrete orders emitted by the order builder and handed to execution.

use super::decimal::Decimal;
use super::primitives::{AccountId, FundId, Instrument, OrderSide, SignalId, StrategyId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Submitted,
    Filled,
    Cancelled,
    Closed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "submitted" => Some(OrderStatus::Submitted),
            "filled" => Some(OrderStatus::Filled),
            "cancelled" => Some(OrderStatus::Cancelled),
            "closed" => Some(OrderStatus::Closed),
            _ => None,
        }
    }
}

/// One broker order, scoped to a single account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub signal_id: SignalId,
    pub fund_id: FundId,
    pub account_id: AccountId,
    pub strategy_id: StrategyId,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub notional_value: Decimal,
    pub status: OrderStatus,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        signal_id: SignalId,
        fund_id: FundId,
        account_id: AccountId,
        strategy_id: StrategyId,
        instrument: Instrument,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        let notional_value = quantity * price;
        Order {
            order_id: Uuid::new_v4().to_string(),
            signal_id,
            fund_id,
            account_id,
            strategy_id,
            instrument,
            side,
            quantity,
            price,
            notional_value,
            status: OrderStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_computes_notional_and_starts_pending() {
        let order = Order::new(
            SignalId::new("sig-1"),
            FundId::new("fund-1"),
            AccountId::new("acct-1"),
            StrategyId::new("momentum"),
            Instrument::new("AAPL"),
            OrderSide::Buy,
            Decimal::from_i64(100),
            Decimal::from_str_canonical("235").unwrap(),
        );
        assert_eq!(order.notional_value, Decimal::from_i64(23500));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.order_id.is_empty());
    }

    #[test]
    fn test_order_ids_are_unique() {
        let make = || {
            Order::new(
                SignalId::new("sig-1"),
                FundId::new("fund-1"),
                AccountId::new("acct-1"),
                StrategyId::new("momentum"),
                Instrument::new("AAPL"),
                OrderSide::Buy,
                Decimal::one(),
                Decimal::one(),
            )
        };
        assert_ne!(make().order_id, make().order_id);
    }
}
