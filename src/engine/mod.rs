//! The decision engine's computational core: margin, sizing, capital
//! bookkeeping, distribution, and order construction.

pub mod distributor;
pub mod ledger;
pub mod margin;
pub mod order_builder;
pub mod sizer;

pub use distributor::{distribute, eligible_accounts, AccountAllocation, DistributorConfig};
pub use ledger::{CapitalLedger, CapitalSnapshot};
pub use margin::{required_margin, BrokerContext, MarginError, MarginQuote};
pub use order_builder::{build_order, OrderTemplate, PrecisionRegistry, PrecisionRule};
pub use sizer::{size_entry, SizingInputs};
