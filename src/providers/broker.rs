//! Broker capability interface.
//!
//! IBKR, Zerodha, and the mock all sit behind this one trait; the engine
//! never names a concrete broker. Margin previews feed the futures and
//! options policies of the margin factory.

use crate::domain::{AccountId, AssetClass, Decimal, Instrument, Order, OrderSide};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("broker rejected request: {0}")]
    Rejected(String),
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
}

impl BrokerError {
    /// Definitive broker answers (rejection, bad symbol) are not retried;
    /// only availability failures are.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Unavailable(_))
    }
}

/// Order shape submitted for a margin preview.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginPreviewRequest {
    pub instrument: Instrument,
    pub asset_class: AssetClass,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Minimal broker capability set the decision engine depends on.
#[async_trait]
pub trait Broker: Send + Sync + fmt::Debug {
    /// Stable broker identifier ("ibkr", "zerodha", "mock").
    fn name(&self) -> &str;

    /// Current cash balance of an account at this broker.
    async fn get_balance(&self, account_id: &AccountId) -> Result<Decimal, BrokerError>;

    /// Per-contract (futures) or total (options) initial margin the broker
    /// would require for this order shape.
    async fn preview_margin(&self, request: &MarginPreviewRequest) -> Result<Decimal, BrokerError>;

    /// Hand an order to the broker. The engine itself routes orders via
    /// the execution sink; this exists so broker implementations present
    /// one complete capability set.
    async fn place_order(&self, order: &Order) -> Result<(), BrokerError>;
}

/// In-memory broker for tests: canned margins per instrument, balance per
/// account, optional forced failure.
#[derive(Debug, Default)]
pub struct MockBroker {
    margins: HashMap<Instrument, Decimal>,
    balances: HashMap<AccountId, Decimal>,
    fail_preview: bool,
    placed: Mutex<Vec<Order>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margin(mut self, instrument: Instrument, per_contract: Decimal) -> Self {
        self.margins.insert(instrument, per_contract);
        self
    }

    pub fn with_balance(mut self, account_id: AccountId, balance: Decimal) -> Self {
        self.balances.insert(account_id, balance);
        self
    }

    pub fn failing_preview(mut self) -> Self {
        self.fail_preview = true;
        self
    }

    pub fn placed_orders(&self) -> Vec<Order> {
        self.placed.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl Broker for MockBroker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_balance(&self, account_id: &AccountId) -> Result<Decimal, BrokerError> {
        self.balances
            .get(account_id)
            .copied()
            .ok_or_else(|| BrokerError::Rejected(format!("unknown account {}", account_id)))
    }

    async fn preview_margin(&self, request: &MarginPreviewRequest) -> Result<Decimal, BrokerError> {
        if self.fail_preview {
            return Err(BrokerError::Unavailable("preview offline".to_string()));
        }
        self.margins
            .get(&request.instrument)
            .copied()
            .ok_or_else(|| BrokerError::UnknownInstrument(request.instrument.to_string()))
    }

    async fn place_order(&self, order: &Order) -> Result<(), BrokerError> {
        self.placed
            .lock()
            .expect("mock lock poisoned")
            .push(order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_mock_broker_preview_margin() {
        let broker = MockBroker::new().with_margin(Instrument::new("ESZ5"), d("12650"));
        let request = MarginPreviewRequest {
            instrument: Instrument::new("ESZ5"),
            asset_class: AssetClass::Future,
            side: OrderSide::Buy,
            quantity: d("2"),
            price: d("5000"),
        };
        assert_eq!(broker.preview_margin(&request).await.unwrap(), d("12650"));
    }

    #[tokio::test]
    async fn test_unknown_instrument_is_permanent() {
        let broker = MockBroker::new();
        let request = MarginPreviewRequest {
            instrument: Instrument::new("NOPE"),
            asset_class: AssetClass::Future,
            side: OrderSide::Buy,
            quantity: d("1"),
            price: d("1"),
        };
        let err = broker.preview_margin(&request).await.unwrap_err();
        assert!(matches!(err, BrokerError::UnknownInstrument(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_failing_preview_is_transient() {
        let broker = MockBroker::new().failing_preview();
        let request = MarginPreviewRequest {
            instrument: Instrument::new("ESZ5"),
            asset_class: AssetClass::Future,
            side: OrderSide::Buy,
            quantity: d("1"),
            price: d("1"),
        };
        let err = broker.preview_margin(&request).await.unwrap_err();
        assert!(err.is_transient());
    }
}
