//! Execution sink: where approved orders go after the decision commits.
//!
//! At-least-once, fire-and-forget; the orchestrator never waits for fills.

use crate::domain::Order;
use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("execution sink unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ExecutionSink: Send + Sync + fmt::Debug {
    /// Submit one order for execution. Failures are logged by the caller
    /// and retried at the transport layer, never by re-deciding the signal.
    async fn submit_order(&self, order: &Order) -> Result<(), ExecutionError>;
}

/// Posts approved orders to the execution service.
#[derive(Debug, Clone)]
pub struct RestExecutionSink {
    client: reqwest::Client,
    base_url: String,
}

impl RestExecutionSink {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ExecutionSink for RestExecutionSink {
    async fn submit_order(&self, order: &Order) -> Result<(), ExecutionError> {
        let url = format!("{}/v1/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(order)
            .send()
            .await
            .map_err(|e| ExecutionError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ExecutionError::Unavailable(format!(
                "execution service returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Records submissions for assertions in tests.
#[derive(Debug, Default)]
pub struct MockExecutionSink {
    submitted: Mutex<Vec<Order>>,
    fail: bool,
}

impl MockExecutionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        MockExecutionSink {
            submitted: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn submitted_orders(&self) -> Vec<Order> {
        self.submitted.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl ExecutionSink for MockExecutionSink {
    async fn submit_order(&self, order: &Order) -> Result<(), ExecutionError> {
        if self.fail {
            return Err(ExecutionError::Unavailable("sink offline".to_string()));
        }
        self.submitted
            .lock()
            .expect("mock lock poisoned")
            .push(order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountId, Decimal, FundId, Instrument, OrderSide, SignalId, StrategyId,
    };

    fn order() -> Order {
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
    }

    #[tokio::test]
    async fn test_mock_sink_records_submissions() {
        let sink = MockExecutionSink::new();
        sink.submit_order(&order()).await.unwrap();
        assert_eq!(sink.submitted_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_errors() {
        let sink = MockExecutionSink::failing();
        assert!(sink.submit_order(&order()).await.is_err());
        assert!(sink.submitted_orders().is_empty());
    }
}
