//! Open positions, the engine's conflict-detection input and the subject
//! of exit signals.

use super::decimal::Decimal;
use super::primitives::{AccountId, Direction, FundId, Instrument, StrategyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closing,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closing => "closing",
            PositionStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<PositionStatus> {
        match s {
            "open" => Some(PositionStatus::Open),
            "closing" => Some(PositionStatus::Closing),
            "closed" => Some(PositionStatus::Closed),
            _ => None,
        }
    }
}

/// A live holding created by a filled entry order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: Instrument,
    pub strategy_id: StrategyId,
    pub fund_id: FundId,
    pub account_id: AccountId,
    pub direction: Direction,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub status: PositionStatus,
}

impl Position {
    /// Cash value of the position at its entry price.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.entry_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_notional() {
        let position = Position {
            instrument: Instrument::new("AAPL"),
            strategy_id: StrategyId::new("momentum"),
            fund_id: FundId::new("fund-1"),
            account_id: AccountId::new("acct-1"),
            direction: Direction::Long,
            quantity: Decimal::from_i64(100),
            entry_price: Decimal::from_str_canonical("235.50").unwrap(),
            status: PositionStatus::Open,
        };
        assert_eq!(position.notional(), Decimal::from_i64(23550));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PositionStatus::Open,
            PositionStatus::Closing,
            PositionStatus::Closed,
        ] {
            assert_eq!(PositionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PositionStatus::parse("liquidated"), None);
    }
}
