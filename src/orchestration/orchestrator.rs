//! The decision orchestrator: one signal in, exactly one decision out.
//!
//! Drives the pipeline described by the domain model: idempotency check,
//! structural validation, allocation resolution, then a concurrent
//! per-fund fan-out (conflict check, margin, ledger, sizing, distribution,
//! order construction) under per-(fund, strategy) locks. The decision and
//! its orders commit in a single transaction; order submission happens
//! after commit and is never allowed to change the verdict.

use super::locks::FundStrategyLocks;
use crate::config::Config;
use crate::db::Repository;
use crate::domain::{
    Action, ActiveAllocation, AssetClass, BrokerId, Decimal, Decision, FundId, FundOutcome,
    FundState, FundStatus, Order, OrderSide, OrderStatus, PositionStatus, RejectReason, Signal,
    StrategyId,
};
use crate::engine::{
    build_order, distribute, eligible_accounts, required_margin, size_entry, BrokerContext,
    CapitalLedger, CapitalSnapshot, DistributorConfig, MarginError, OrderTemplate,
    PrecisionRegistry, SizingInputs,
};
use crate::providers::{
    AccountDataProvider, AllocationProvider, Broker, ExecutionSink, MarginPreviewRequest,
    ProviderError,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

/// Failures that abort signal processing instead of becoming rejections.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),
}

/// One fund's resolution plus the side effects that must wait for the
/// decision to commit: the exit-position transition and the lock guard.
struct FundDecision {
    outcome: FundOutcome,
    exit_position: Option<i64>,
    _guard: Option<OwnedMutexGuard<()>>,
}

impl FundDecision {
    fn rejected(fund_id: FundId, reason: RejectReason) -> Self {
        FundDecision {
            outcome: FundOutcome::rejected(fund_id, reason),
            exit_position: None,
            _guard: None,
        }
    }
}

pub struct DecisionOrchestrator {
    repo: Arc<Repository>,
    ledger: CapitalLedger,
    accounts: Arc<dyn AccountDataProvider>,
    allocations: Arc<dyn AllocationProvider>,
    brokers: HashMap<BrokerId, Arc<dyn Broker>>,
    execution: Arc<dyn ExecutionSink>,
    precision: PrecisionRegistry,
    locks: FundStrategyLocks,
    config: Config,
}

impl DecisionOrchestrator {
    pub fn new(
        repo: Arc<Repository>,
        accounts: Arc<dyn AccountDataProvider>,
        allocations: Arc<dyn AllocationProvider>,
        execution: Arc<dyn ExecutionSink>,
        config: Config,
    ) -> Self {
        DecisionOrchestrator {
            ledger: CapitalLedger::new(repo.clone()),
            repo,
            accounts,
            allocations,
            brokers: HashMap::new(),
            execution,
            precision: PrecisionRegistry::new(),
            locks: FundStrategyLocks::new(),
            config,
        }
    }

    /// Register a broker for margin previews on its accounts.
    pub fn with_broker(mut self, broker_id: BrokerId, broker: Arc<dyn Broker>) -> Self {
        self.brokers.insert(broker_id, broker);
        self
    }

    /// Replace the default precision rules.
    pub fn with_precision(mut self, precision: PrecisionRegistry) -> Self {
        self.precision = precision;
        self
    }

    /// Decide a signal. Re-delivery of an already-decided signal_id
    /// returns the stored decision and produces no new orders.
    ///
    /// # Errors
    /// `EngineError::Persistence` when the decision cannot be read or
    /// committed; every business failure becomes a rejection inside the
    /// returned decision instead.
    pub async fn process_signal(&self, signal: &Signal) -> Result<Decision, EngineError> {
        if let Some(existing) = self.repo.get_decision(&signal.signal_id).await? {
            info!(
                signal = %signal.signal_id,
                "signal already decided; returning stored decision"
            );
            return Ok(existing);
        }

        if let Err(reason) = signal.validate() {
            let decision = Decision::rejected(signal.signal_id.clone(), reason);
            return self.finalize(signal, decision, Vec::new()).await;
        }

        let allocations = match self
            .fetch_with_retries(|| self.allocations.get_active_allocations(&signal.strategy_id))
            .await
        {
            Ok(allocations) => allocations,
            Err(e) => {
                let decision = Decision::rejected(
                    signal.signal_id.clone(),
                    RejectReason::AccountDataUnavailable(e.to_string()),
                );
                return self.finalize(signal, decision, Vec::new()).await;
            }
        };
        if allocations.is_empty() {
            let decision =
                Decision::rejected(signal.signal_id.clone(), RejectReason::NoActiveAllocation);
            return self.finalize(signal, decision, Vec::new()).await;
        }

        let deadline = Duration::from_millis(self.config.signal_deadline_ms);
        let fund_futures = allocations.into_iter().map(|allocation| {
            let fund_id = allocation.fund_id.clone();
            async move {
                match tokio::time::timeout(deadline, self.decide_for_fund(signal, allocation))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Ok(FundDecision::rejected(fund_id, RejectReason::Timeout)),
                }
            }
        });

        let mut fund_decisions = Vec::new();
        for result in join_all(fund_futures).await {
            fund_decisions.push(result?);
        }

        let outcomes = fund_decisions.iter().map(|d| d.outcome.clone()).collect();
        let decision = Decision::from_outcomes(signal.signal_id.clone(), outcomes);
        self.finalize(signal, decision, fund_decisions).await
    }

    /// Capital view for the read API: the strategy's ACTIVE weight in the
    /// fund resolved against live equity, then the ledger snapshot.
    ///
    /// # Errors
    /// Provider failures surface as `EngineError::Provider`; a missing
    /// allocation is `Ok(None)`.
    pub async fn capital_snapshot(
        &self,
        fund_id: &FundId,
        strategy_id: &StrategyId,
    ) -> Result<Option<CapitalSnapshot>, EngineError> {
        let allocations = self
            .fetch_with_retries(|| self.allocations.get_active_allocations(strategy_id))
            .await?;
        let Some(allocation) = allocations.into_iter().find(|a| &a.fund_id == fund_id) else {
            return Ok(None);
        };
        let fund = self
            .fetch_with_retries(|| self.accounts.get_fund_state(fund_id))
            .await?;
        let snapshot = self
            .ledger
            .available_capital(fund_id, strategy_id, fund.total_equity, allocation.weight_pct)
            .await?;
        Ok(Some(snapshot))
    }

    /// Commit the decision, apply exit transitions, release locks, then
    /// submit orders. A lost insert race returns the stored decision and
    /// submits nothing.
    async fn finalize(
        &self,
        signal: &Signal,
        decision: Decision,
        fund_decisions: Vec<FundDecision>,
    ) -> Result<Decision, EngineError> {
        let inserted = self.repo.record_decision(signal, &decision).await?;
        if !inserted {
            warn!(
                signal = %signal.signal_id,
                "concurrent decision already committed; discarding this one"
            );
            let stored = self.repo.get_decision(&signal.signal_id).await?;
            return Ok(stored.unwrap_or(decision));
        }

        for fund_decision in &fund_decisions {
            if let Some(position_id) = fund_decision.exit_position {
                self.repo
                    .set_position_status(position_id, PositionStatus::Closing)
                    .await?;
            }
        }

        // Locks release only after the commit and position transitions.
        drop(fund_decisions);

        for order in decision.orders() {
            match self.execution.submit_order(order).await {
                Ok(()) => {
                    self.repo
                        .set_order_status(&order.order_id, OrderStatus::Submitted)
                        .await?;
                }
                Err(e) => {
                    warn!(
                        order = %order.order_id,
                        error = %e,
                        "execution submission failed; order stays pending"
                    );
                }
            }
        }

        info!(
            signal = %signal.signal_id,
            verdict = decision.verdict.as_str(),
            orders = decision.orders().count(),
            "decision committed"
        );
        Ok(decision)
    }

    async fn decide_for_fund(
        &self,
        signal: &Signal,
        allocation: ActiveAllocation,
    ) -> Result<FundDecision, EngineError> {
        let fund_id = allocation.fund_id.clone();
        let guard = self.locks.acquire(&fund_id, &signal.strategy_id).await;

        let fund = match self
            .fetch_with_retries(|| self.accounts.get_fund_state(&fund_id))
            .await
        {
            Ok(fund) => fund,
            Err(e) => {
                return Ok(FundDecision::rejected(
                    fund_id,
                    RejectReason::AccountDataUnavailable(e.to_string()),
                ))
            }
        };
        if fund.status != FundStatus::Active {
            return Ok(FundDecision::rejected(fund_id, RejectReason::FundNotActive));
        }

        let live = self
            .repo
            .find_live_position(&fund_id, &signal.strategy_id, &signal.instrument)
            .await?;

        match signal.action {
            Action::Exit => {
                let Some(stored) = live else {
                    return Ok(FundDecision::rejected(
                        fund_id,
                        RejectReason::NoOpenPosition,
                    ));
                };
                if stored.position.status != PositionStatus::Open {
                    // An exit is already in flight for this position.
                    return Ok(FundDecision::rejected(
                        fund_id,
                        RejectReason::NoOpenPosition,
                    ));
                }
                let order = Order::new(
                    signal.signal_id.clone(),
                    fund_id.clone(),
                    stored.position.account_id.clone(),
                    signal.strategy_id.clone(),
                    signal.instrument.clone(),
                    OrderSide::closing(stored.position.direction),
                    stored.position.quantity,
                    signal.price,
                );
                Ok(FundDecision {
                    outcome: FundOutcome::approved(fund_id, vec![order]),
                    exit_position: Some(stored.position_id),
                    _guard: Some(guard),
                })
            }
            Action::Entry => {
                if let Some(stored) = live {
                    let reason = if stored.position.direction == signal.direction {
                        RejectReason::DuplicateEntry
                    } else {
                        RejectReason::MustExitFirst
                    };
                    return Ok(FundDecision::rejected(fund_id, reason));
                }
                self.enter_fund(signal, &allocation, fund, guard).await
            }
        }
    }

    async fn enter_fund(
        &self,
        signal: &Signal,
        allocation: &ActiveAllocation,
        fund: FundState,
        guard: OwnedMutexGuard<()>,
    ) -> Result<FundDecision, EngineError> {
        let fund_id = fund.fund_id.clone();

        let eligible =
            match eligible_accounts(&fund, allocation, signal.asset_class, &signal.instrument) {
                Ok(eligible) => eligible,
                Err(reason) => return Ok(FundDecision::rejected(fund_id, reason)),
            };
        let lead_broker = eligible[0].broker.clone();

        let Some(requested) = signal.requested_capital() else {
            return Ok(FundDecision::rejected(
                fund_id,
                RejectReason::MalformedSignal("entry signal has no size".to_string()),
            ));
        };

        let estimate_quantity = signal.quantity.unwrap_or(requested / signal.price);
        let context = match self
            .margin_context(signal, &lead_broker, estimate_quantity)
            .await
        {
            Ok(context) => context,
            Err(reason) => return Ok(FundDecision::rejected(fund_id, reason)),
        };
        let quote = match required_margin(
            signal.asset_class,
            estimate_quantity,
            signal.price,
            &context,
        ) {
            Ok(quote) => quote,
            Err(MarginError::UnsupportedAssetClass(class)) => {
                return Ok(FundDecision::rejected(
                    fund_id,
                    RejectReason::UnsupportedAssetClass(class),
                ))
            }
            Err(MarginError::DataUnavailable(msg)) => {
                return Ok(FundDecision::rejected(
                    fund_id,
                    RejectReason::MarginDataUnavailable(msg),
                ))
            }
        };

        let snapshot = self
            .ledger
            .available_capital(
                &fund_id,
                &signal.strategy_id,
                fund.total_equity,
                allocation.weight_pct,
            )
            .await?;

        let rule = self.precision.rule_for(&lead_broker, signal.asset_class);
        let inputs = SizingInputs {
            requested_capital: requested,
            available_capital: snapshot.available,
            total_equity: fund.total_equity,
            margin_ratio: quote.margin_ratio,
            slippage_buffer: self.config.slippage_buffer,
            max_position_pct: self.config.max_position_size_pct,
            min_tradeable_notional: rule.min_tradeable_notional(signal.price),
        };
        let target = match size_entry(&inputs) {
            Ok(target) => target,
            Err(reason) => return Ok(FundDecision::rejected(fund_id, reason)),
        };

        let distributor_config = DistributorConfig {
            max_broker_allocation_pct: self.config.max_broker_allocation_pct,
        };
        let allocations = distribute(&eligible, target, fund.total_equity, &distributor_config);

        let template = OrderTemplate {
            signal_id: signal.signal_id.clone(),
            fund_id: fund_id.clone(),
            strategy_id: signal.strategy_id.clone(),
            instrument: signal.instrument.clone(),
            asset_class: signal.asset_class,
            direction: signal.direction,
            price: signal.price,
        };
        let orders: Vec<Order> = allocations
            .iter()
            .filter_map(|account| {
                build_order(
                    &template,
                    &account.account_id,
                    &account.broker,
                    account.allocated_capital,
                    &self.precision,
                )
            })
            .collect();

        if orders.is_empty() {
            return Ok(FundDecision::rejected(
                fund_id,
                RejectReason::BelowMinTradeableSize,
            ));
        }
        Ok(FundDecision {
            outcome: FundOutcome::approved(fund_id, orders),
            exit_position: None,
            _guard: Some(guard),
        })
    }

    /// Assemble the broker-supplied margin inputs the asset class needs.
    /// Stock, crypto, and option policies are self-contained; futures and
    /// forex require a preview from the account's broker.
    async fn margin_context(
        &self,
        signal: &Signal,
        broker_id: &BrokerId,
        quantity: Decimal,
    ) -> Result<BrokerContext, RejectReason> {
        match signal.asset_class {
            AssetClass::Stock | AssetClass::Crypto | AssetClass::Option => {
                Ok(BrokerContext::default())
            }
            AssetClass::Future => {
                let per_contract = self.preview_margin(signal, broker_id, quantity).await?;
                Ok(BrokerContext {
                    futures_initial_margin: Some(per_contract),
                    ..Default::default()
                })
            }
            AssetClass::Forex => {
                let total = self.preview_margin(signal, broker_id, quantity).await?;
                let notional = quantity * signal.price;
                if !notional.is_positive() {
                    return Err(RejectReason::MarginDataUnavailable(
                        "zero notional for margin preview".to_string(),
                    ));
                }
                Ok(BrokerContext {
                    forex_pair_margin_pct: Some(total / notional),
                    ..Default::default()
                })
            }
        }
    }

    async fn preview_margin(
        &self,
        signal: &Signal,
        broker_id: &BrokerId,
        quantity: Decimal,
    ) -> Result<Decimal, RejectReason> {
        let broker = self.brokers.get(broker_id).ok_or_else(|| {
            RejectReason::MarginDataUnavailable(format!("no broker registered for {}", broker_id))
        })?;
        let request = MarginPreviewRequest {
            instrument: signal.instrument.clone(),
            asset_class: signal.asset_class,
            side: OrderSide::opening(signal.direction),
            quantity,
            price: signal.price,
        };

        let mut attempt: u32 = 0;
        loop {
            match broker.preview_margin(&request).await {
                Ok(margin) => return Ok(margin),
                Err(e) if e.is_transient() && attempt < self.config.account_query_retries => {
                    attempt += 1;
                    warn!(
                        broker = broker.name(),
                        attempt,
                        error = %e,
                        "transient margin preview failure; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(50u64 << attempt)).await;
                }
                Err(e) => return Err(RejectReason::MarginDataUnavailable(e.to_string())),
            }
        }
    }

    /// Run a provider call under the configured timeout, retrying
    /// transient failures up to the configured attempt budget.
    async fn fetch_with_retries<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let timeout = Duration::from_millis(self.config.account_query_timeout_ms);
        let mut attempt: u32 = 0;
        loop {
            let error = match tokio::time::timeout(timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::NetworkError("provider query timed out".to_string()),
            };
            if attempt >= self.config.account_query_retries {
                return Err(error);
            }
            attempt += 1;
            warn!(attempt, error = %error, "transient provider failure; retrying");
            tokio::time::sleep(Duration::from_millis(50u64 << attempt)).await;
        }
    }
}
