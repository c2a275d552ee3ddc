//! External collaborator interfaces: account state, allocations, brokers,
//! and the execution sink.
//!
//! The engine only depends on these traits; REST implementations handle
//! retry/backoff and the mocks drive tests.

use crate::domain::{ActiveAllocation, FundState, FundId, StrategyId};
use async_trait::async_trait;
use std::fmt;

pub mod broker;
pub mod execution;
pub mod mock;
pub mod rest;

pub use broker::{Broker, BrokerError, MarginPreviewRequest, MockBroker};
pub use execution::{ExecutionSink, MockExecutionSink, RestExecutionSink};
pub use mock::{MockAccountDataProvider, MockAllocationProvider};
pub use rest::{RestAccountDataProvider, RestAllocationProvider};

/// Reads fund equity and per-account state maintained by the external
/// account poller.
#[async_trait]
pub trait AccountDataProvider: Send + Sync + fmt::Debug {
    /// Fetch a fund's equity and the state of every account it owns.
    async fn get_fund_state(&self, fund_id: &FundId) -> Result<FundState, ProviderError>;
}

/// Resolves which funds (and weights) currently apply to a strategy.
#[async_trait]
pub trait AllocationProvider: Send + Sync + fmt::Debug {
    /// ACTIVE allocations whose strategy weights include `strategy_id`;
    /// at most one entry per fund.
    async fn get_active_allocations(
        &self,
        strategy_id: &StrategyId,
    ) -> Result<Vec<ActiveAllocation>, ProviderError>;
}

/// Error type for provider operations.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection refused, DNS failure, timeout).
    NetworkError(String),
    /// HTTP error from the upstream service.
    HttpError { status: u16, message: String },
    /// Malformed response payload.
    ParseError(String),
    /// Requested entity does not exist upstream.
    NotFound(String),
    /// Other error.
    Other(String),
}

impl ProviderError {
    /// True when a retry with backoff might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::NetworkError(_) => true,
            ProviderError::HttpError { status, .. } => *status >= 500 || *status == 429,
            ProviderError::ParseError(_) | ProviderError::NotFound(_) | ProviderError::Other(_) => {
                false
            }
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ProviderError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ProviderError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ProviderError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ProviderError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}
