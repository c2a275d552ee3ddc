//! Fund and account state, read-only inputs owned by external services.

use super::decimal::Decimal;
use super::primitives::{AccountId, AssetClass, BrokerId, FundId, Instrument};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Operational status of a fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundStatus {
    Active,
    Paused,
    Closed,
}

/// Which instruments of an asset class an account may trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClassSupport {
    /// All instruments of the class are tradeable.
    All,
    /// Only the listed symbols are tradeable.
    Symbols(HashSet<Instrument>),
}

/// Point-in-time state of one broker account, refreshed by an external
/// poller before each signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub account_id: AccountId,
    pub fund_id: FundId,
    pub broker: BrokerId,
    pub equity: Decimal,
    pub available_margin: Decimal,
    pub asset_class_support: HashMap<AssetClass, AssetClassSupport>,
}

impl AccountState {
    /// True if the account may trade this instrument of this asset class.
    pub fn supports(&self, asset_class: AssetClass, instrument: &Instrument) -> bool {
        match self.asset_class_support.get(&asset_class) {
            Some(AssetClassSupport::All) => true,
            Some(AssetClassSupport::Symbols(symbols)) => symbols.contains(instrument),
            None => false,
        }
    }

    /// True if the account supports the asset class for any instrument.
    pub fn supports_class(&self, asset_class: AssetClass) -> bool {
        self.asset_class_support.contains_key(&asset_class)
    }
}

/// Fund equity plus the state of every account it owns, as returned by the
/// account data provider in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundState {
    pub fund_id: FundId,
    pub total_equity: Decimal,
    pub status: FundStatus,
    pub accounts: Vec<AccountState>,
}
