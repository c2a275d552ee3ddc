//! REST implementations of the account and allocation providers.
//!
//! Both talk to the internal account service and share the same retry
//! policy: transient failures (network, 5xx, 429) are retried with
//! exponential backoff; definitive answers (4xx, parse errors) are not.

use super::{AccountDataProvider, AllocationProvider, ProviderError};
use crate::domain::{ActiveAllocation, FundId, FundState, StrategyId};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(10)),
        ..Default::default()
    }
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, ProviderError> {
    retry(retry_policy(), || async {
        let response = client.get(url).send().await.map_err(|e| {
            backoff::Error::transient(ProviderError::NetworkError(e.to_string()))
        })?;

        let status = response.status();
        if status == 429 || status.is_server_error() {
            return Err(backoff::Error::transient(ProviderError::HttpError {
                status: status.as_u16(),
                message: "upstream unavailable".to_string(),
            }));
        }
        if status == 404 {
            return Err(backoff::Error::permanent(ProviderError::NotFound(
                url.to_string(),
            )));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(ProviderError::HttpError {
                status: status.as_u16(),
                message: "client error".to_string(),
            }));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| backoff::Error::permanent(ProviderError::ParseError(e.to_string())))
    })
    .await
}

/// Account data provider over the account service's REST API.
#[derive(Debug, Clone)]
pub struct RestAccountDataProvider {
    client: Client,
    base_url: String,
}

impl RestAccountDataProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl AccountDataProvider for RestAccountDataProvider {
    async fn get_fund_state(&self, fund_id: &FundId) -> Result<FundState, ProviderError> {
        let url = format!("{}/v1/funds/{}/state", self.base_url, fund_id);
        debug!(fund = %fund_id, "fetching fund state");
        get_json(&self.client, &url).await
    }
}

/// Allocation provider over the same account service.
#[derive(Debug, Clone)]
pub struct RestAllocationProvider {
    client: Client,
    base_url: String,
}

impl RestAllocationProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl AllocationProvider for RestAllocationProvider {
    async fn get_active_allocations(
        &self,
        strategy_id: &StrategyId,
    ) -> Result<Vec<ActiveAllocation>, ProviderError> {
        let url = format!(
            "{}/v1/strategies/{}/allocations/active",
            self.base_url, strategy_id
        );
        debug!(strategy = %strategy_id, "fetching active allocations");
        get_json(&self.client, &url).await
    }
}
