pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod providers;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Action, AssetClass, Decimal, Decision, Direction, FundId, Order, OrderSide, Position,
    RejectReason, Signal, SignalId, StrategyId, Verdict,
};
pub use error::AppError;
pub use orchestration::{DecisionOrchestrator, EngineError};
pub use providers::{AccountDataProvider, AllocationProvider, Broker, ExecutionSink};
