//! Domain primitives: identifiers, asset classes, directions, sides.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier of a signal, the idempotency key for decisions.
    SignalId
);
id_newtype!(
    /// Identifier of the strategy that emitted a signal.
    StrategyId
);
id_newtype!(
    /// Identifier of a fund.
    FundId
);
id_newtype!(
    /// Identifier of a broker account within a fund.
    AccountId
);
id_newtype!(
    /// Traded instrument symbol (e.g. "AAPL", "ESZ5", "EUR/USD", "BTC").
    Instrument
);
id_newtype!(
    /// Broker the account is held at (e.g. "ibkr", "zerodha", "mock").
    BrokerId
);

/// Asset class of an instrument; each class carries its own margin policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Future,
    Option,
    Forex,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Future => "future",
            AssetClass::Option => "option",
            AssetClass::Forex => "forex",
            AssetClass::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<AssetClass> {
        match s {
            "stock" => Some(AssetClass::Stock),
            "future" => Some(AssetClass::Future),
            "option" => Some(AssetClass::Option),
            "forex" => Some(AssetClass::Forex),
            "crypto" => Some(AssetClass::Crypto),
            _ => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a signal opens or closes exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Entry,
    Exit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Entry => write!(f, "entry"),
            Action::Exit => write!(f, "exit"),
        }
    }
}

/// Directional exposure of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The direction on the other side of the book.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Buy/sell side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side that opens a position in the given direction.
    pub fn opening(direction: Direction) -> OrderSide {
        match direction {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }

    /// Side that closes a position in the given direction.
    pub fn closing(direction: Direction) -> OrderSide {
        Self::opening(direction.opposite())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<OrderSide> {
        match s {
            "buy" => Some(OrderSide::Buy),
            "sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(Direction::Short.opposite(), Direction::Long);
    }

    #[test]
    fn test_order_side_for_direction() {
        assert_eq!(OrderSide::opening(Direction::Long), OrderSide::Buy);
        assert_eq!(OrderSide::opening(Direction::Short), OrderSide::Sell);
        assert_eq!(OrderSide::closing(Direction::Long), OrderSide::Sell);
        assert_eq!(OrderSide::closing(Direction::Short), OrderSide::Buy);
    }

    #[test]
    fn test_asset_class_roundtrip() {
        for class in [
            AssetClass::Stock,
            AssetClass::Future,
            AssetClass::Option,
            AssetClass::Forex,
            AssetClass::Crypto,
        ] {
            assert_eq!(AssetClass::parse(class.as_str()), Some(class));
        }
        assert_eq!(AssetClass::parse("bond"), None);
    }

    #[test]
    fn test_asset_class_serialization() {
        let json = serde_json::to_string(&AssetClass::Stock).unwrap();
        assert_eq!(json, "\"stock\"");
    }

    #[test]
    fn test_id_display() {
        let fund = FundId::new("fund-1");
        assert_eq!(fund.to_string(), "fund-1");
        assert_eq!(fund.as_str(), "fund-1");
    }
}
