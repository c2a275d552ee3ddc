//! Normalized trading signal, the input to the decision engine.

use super::decimal::Decimal;
use super::decision::RejectReason;
use super::primitives::{Action, AssetClass, Direction, Instrument, SignalId, StrategyId};
use serde::{Deserialize, Serialize};

/// Order type requested by the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

/// A strategy's request to open or close a position.
///
/// Immutable once received; consumed exactly once by the decision
/// orchestrator, keyed by `signal_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: SignalId,
    pub strategy_id: StrategyId,
    pub instrument: Instrument,
    pub asset_class: AssetClass,
    pub action: Action,
    pub direction: Direction,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Requested quantity, mutually optional with `cash_amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    /// Requested cash notional, mutually optional with `quantity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_amount: Option<Decimal>,
    /// Reference price used for sizing and notional computation.
    pub price: Decimal,
}

impl Signal {
    /// Structural validation, the `RECEIVED -> VALIDATED` transition.
    ///
    /// # Errors
    /// Returns `RejectReason::MalformedSignal` naming the offending field.
    pub fn validate(&self) -> Result<(), RejectReason> {
        let malformed = |msg: &str| Err(RejectReason::MalformedSignal(msg.to_string()));

        if self.signal_id.as_str().is_empty() {
            return malformed("signal_id is empty");
        }
        if self.strategy_id.as_str().is_empty() {
            return malformed("strategy_id is empty");
        }
        if self.instrument.as_str().is_empty() {
            return malformed("instrument is empty");
        }
        if !self.price.is_positive() {
            return malformed("price must be positive");
        }
        if let Some(qty) = self.quantity {
            if !qty.is_positive() {
                return malformed("quantity must be positive");
            }
        }
        if let Some(cash) = self.cash_amount {
            if !cash.is_positive() {
                return malformed("cash_amount must be positive");
            }
        }
        if self.action == Action::Entry && self.quantity.is_none() && self.cash_amount.is_none() {
            return malformed("entry signal requires quantity or cash_amount");
        }
        match self.order_type {
            OrderType::Limit if self.limit_price.is_none() => {
                malformed("limit order requires limit_price")
            }
            OrderType::Stop if self.stop_price.is_none() => {
                malformed("stop order requires stop_price")
            }
            _ => Ok(()),
        }
    }

    /// Cash notional the strategy asked for (cash_amount, or quantity at
    /// the reference price).
    pub fn requested_capital(&self) -> Option<Decimal> {
        self.cash_amount
            .or_else(|| self.quantity.map(|q| q * self.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_signal() -> Signal {
        Signal {
            signal_id: SignalId::new("sig-1"),
            strategy_id: StrategyId::new("momentum"),
            instrument: Instrument::new("AAPL"),
            asset_class: AssetClass::Stock,
            action: Action::Entry,
            direction: Direction::Long,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            quantity: None,
            cash_amount: Some(Decimal::from_i64(15000)),
            price: Decimal::from_i64(235),
        }
    }

    #[test]
    fn test_valid_entry_signal() {
        assert!(entry_signal().validate().is_ok());
    }

    #[test]
    fn test_empty_signal_id_is_malformed() {
        let mut signal = entry_signal();
        signal.signal_id = SignalId::new("");
        assert!(matches!(
            signal.validate(),
            Err(RejectReason::MalformedSignal(_))
        ));
    }

    #[test]
    fn test_entry_without_size_is_malformed() {
        let mut signal = entry_signal();
        signal.quantity = None;
        signal.cash_amount = None;
        assert!(matches!(
            signal.validate(),
            Err(RejectReason::MalformedSignal(_))
        ));
    }

    #[test]
    fn test_exit_without_size_is_valid() {
        let mut signal = entry_signal();
        signal.action = Action::Exit;
        signal.quantity = None;
        signal.cash_amount = None;
        assert!(signal.validate().is_ok());
    }

    #[test]
    fn test_limit_order_requires_limit_price() {
        let mut signal = entry_signal();
        signal.order_type = OrderType::Limit;
        assert!(signal.validate().is_err());

        signal.limit_price = Some(Decimal::from_i64(230));
        assert!(signal.validate().is_ok());
    }

    #[test]
    fn test_non_positive_price_is_malformed() {
        let mut signal = entry_signal();
        signal.price = Decimal::zero();
        assert!(signal.validate().is_err());
    }

    #[test]
    fn test_requested_capital_prefers_cash_amount() {
        let mut signal = entry_signal();
        assert_eq!(signal.requested_capital(), Some(Decimal::from_i64(15000)));

        signal.cash_amount = None;
        signal.quantity = Some(Decimal::from_i64(100));
        assert_eq!(signal.requested_capital(), Some(Decimal::from_i64(23500)));
    }
}
