//! Domain model for the signal-to-order decision engine.

pub mod allocation;
pub mod decimal;
pub mod decision;
pub mod fund;
pub mod order;
pub mod position;
pub mod primitives;
pub mod signal;

pub use allocation::{ActiveAllocation, AllocationStatus};
pub use decimal::Decimal;
pub use decision::{Decision, FundOutcome, RejectReason, Verdict};
pub use fund::{AccountState, AssetClassSupport, FundState, FundStatus};
pub use order::{Order, OrderStatus};
pub use position::{Position, PositionStatus};
pub use primitives::{
    AccountId, Action, AssetClass, BrokerId, Direction, FundId, Instrument, OrderSide, SignalId,
    StrategyId,
};
pub use signal::{OrderType, Signal};
