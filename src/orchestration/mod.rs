//! Signal intake orchestration: per-(fund, strategy) locking and the
//! decision pipeline.

pub mod locks;
pub mod orchestrator;

pub use locks::FundStrategyLocks;
pub use orchestrator::{DecisionOrchestrator, EngineError};
