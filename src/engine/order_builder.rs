//! Order construction with broker-specific precision rounding.
//!
//! Allocated capital becomes a quantity at the reference price, rounded
//! down to the instrument's lot and decimal rules. An allocation that
//! rounds below the minimum tradeable unit is dropped for that account and
//! its capital is not redistributed (accepted loss, logged).

use crate::domain::{
    AccountId, AssetClass, BrokerId, Decimal, Direction, FundId, Instrument, Order, OrderSide,
    SignalId, StrategyId,
};
use std::collections::HashMap;
use tracing::warn;

/// Rounding and minimum-size rules for one (broker, asset class).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionRule {
    /// Quantities are multiples of this lot.
    pub lot_size: Decimal,
    /// Smallest quantity the broker accepts.
    pub min_quantity: Decimal,
    /// Smallest order notional the broker accepts.
    pub min_notional: Decimal,
    /// Decimal places retained on the quantity.
    pub quantity_decimals: u32,
}

impl PrecisionRule {
    fn whole_units() -> Self {
        PrecisionRule {
            lot_size: Decimal::one(),
            min_quantity: Decimal::one(),
            min_notional: Decimal::zero(),
            quantity_decimals: 0,
        }
    }

    /// Per-asset-class defaults used when no broker override is registered.
    pub fn default_for(asset_class: AssetClass) -> Self {
        match asset_class {
            // Whole shares / contracts; option quantity is in contracts at
            // the contract premium.
            AssetClass::Stock | AssetClass::Future | AssetClass::Option => Self::whole_units(),
            AssetClass::Forex => PrecisionRule {
                lot_size: Decimal::from_i64(1000),
                min_quantity: Decimal::from_i64(1000),
                min_notional: Decimal::zero(),
                quantity_decimals: 0,
            },
            AssetClass::Crypto => PrecisionRule {
                lot_size: Decimal::zero(),
                min_quantity: Decimal::from_str_canonical("0.000001").unwrap_or_default(),
                min_notional: Decimal::from_i64(10),
                quantity_decimals: 6,
            },
        }
    }

    /// Round a raw quantity down to this rule.
    pub fn round_quantity(&self, raw: Decimal) -> Decimal {
        let mut quantity = raw.round_down_dp(self.quantity_decimals);
        if self.lot_size.is_positive() {
            let lots = (quantity / self.lot_size).round_down_dp(0);
            quantity = lots * self.lot_size;
        }
        quantity
    }

    /// Smallest notional this rule can trade at the given price.
    pub fn min_tradeable_notional(&self, price: Decimal) -> Decimal {
        (self.min_quantity * price).max(self.min_notional)
    }
}

/// Registry of precision rules keyed by (broker, asset class), falling
/// back to asset-class defaults.
#[derive(Debug, Clone, Default)]
pub struct PrecisionRegistry {
    overrides: HashMap<(BrokerId, AssetClass), PrecisionRule>,
}

impl PrecisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(
        mut self,
        broker: BrokerId,
        asset_class: AssetClass,
        rule: PrecisionRule,
    ) -> Self {
        self.overrides.insert((broker, asset_class), rule);
        self
    }

    pub fn rule_for(&self, broker: &BrokerId, asset_class: AssetClass) -> PrecisionRule {
        self.overrides
            .get(&(broker.clone(), asset_class))
            .cloned()
            .unwrap_or_else(|| PrecisionRule::default_for(asset_class))
    }
}

/// Identifying fields shared by every order built for one signal+fund.
#[derive(Debug, Clone)]
pub struct OrderTemplate {
    pub signal_id: SignalId,
    pub fund_id: FundId,
    pub strategy_id: StrategyId,
    pub instrument: Instrument,
    pub asset_class: AssetClass,
    pub direction: Direction,
    pub price: Decimal,
}

/// Build one account's order from its allocated capital.
///
/// Returns None when rounding leaves less than the broker's minimum; the
/// dropped capital is logged and intentionally not redistributed.
pub fn build_order(
    template: &OrderTemplate,
    account_id: &AccountId,
    broker: &BrokerId,
    allocated_capital: Decimal,
    registry: &PrecisionRegistry,
) -> Option<Order> {
    let rule = registry.rule_for(broker, template.asset_class);
    let raw_quantity = allocated_capital / template.price;
    let quantity = rule.round_quantity(raw_quantity);

    if quantity < rule.min_quantity
        || !quantity.is_positive()
        || quantity * template.price < rule.min_notional
    {
        warn!(
            signal = %template.signal_id,
            account = %account_id,
            allocated = %allocated_capital,
            quantity = %quantity,
            "allocation below minimum tradeable unit; dropping account"
        );
        return None;
    }

    Some(Order::new(
        template.signal_id.clone(),
        template.fund_id.clone(),
        account_id.clone(),
        template.strategy_id.clone(),
        template.instrument.clone(),
        OrderSide::opening(template.direction),
        quantity,
        template.price,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn template(asset_class: AssetClass, price: &str) -> OrderTemplate {
        OrderTemplate {
            signal_id: SignalId::new("sig-1"),
            fund_id: FundId::new("fund-1"),
            strategy_id: StrategyId::new("momentum"),
            instrument: Instrument::new("AAPL"),
            asset_class,
            direction: Direction::Long,
            price: d(price),
        }
    }

    #[test]
    fn test_stock_rounds_to_whole_shares() {
        let registry = PrecisionRegistry::new();
        let order = build_order(
            &template(AssetClass::Stock, "235"),
            &AccountId::new("acct-1"),
            &BrokerId::new("ibkr"),
            d("9782.61"),
            &registry,
        )
        .unwrap();

        // 9782.61 / 235 = 41.62.. -> 41 shares.
        assert_eq!(order.quantity, d("41"));
        assert_eq!(order.notional_value, d("9635"));
        assert!(order.notional_value <= d("9782.61"));
        assert_eq!(order.side, OrderSide::Buy);
    }

    #[test]
    fn test_short_entry_builds_sell_order() {
        let registry = PrecisionRegistry::new();
        let mut template = template(AssetClass::Stock, "235");
        template.direction = Direction::Short;
        let order = build_order(
            &template,
            &AccountId::new("acct-1"),
            &BrokerId::new("ibkr"),
            d("5000"),
            &registry,
        )
        .unwrap();
        assert_eq!(order.side, OrderSide::Sell);
    }

    #[test]
    fn test_below_one_share_is_dropped() {
        let registry = PrecisionRegistry::new();
        let order = build_order(
            &template(AssetClass::Stock, "235"),
            &AccountId::new("acct-1"),
            &BrokerId::new("ibkr"),
            d("200"),
            &registry,
        );
        assert!(order.is_none());
    }

    #[test]
    fn test_forex_rounds_to_thousand_unit_lots() {
        let registry = PrecisionRegistry::new();
        let order = build_order(
            &template(AssetClass::Forex, "1.10"),
            &AccountId::new("acct-1"),
            &BrokerId::new("ibkr"),
            d("5000"),
            &registry,
        )
        .unwrap();
        // 5000 / 1.10 = 4545.45.. -> 4000 units.
        assert_eq!(order.quantity, d("4000"));
    }

    #[test]
    fn test_crypto_fractional_quantity_with_min_notional() {
        let registry = PrecisionRegistry::new();
        let order = build_order(
            &template(AssetClass::Crypto, "60000"),
            &AccountId::new("acct-1"),
            &BrokerId::new("mock"),
            d("15000"),
            &registry,
        )
        .unwrap();
        assert_eq!(order.quantity, d("0.25"));

        let dust = build_order(
            &template(AssetClass::Crypto, "60000"),
            &AccountId::new("acct-1"),
            &BrokerId::new("mock"),
            d("5"),
            &registry,
        );
        assert!(dust.is_none());
    }

    #[test]
    fn test_broker_override_takes_precedence() {
        let registry = PrecisionRegistry::new().with_rule(
            BrokerId::new("zerodha"),
            AssetClass::Stock,
            PrecisionRule {
                lot_size: Decimal::from_i64(10),
                min_quantity: Decimal::from_i64(10),
                min_notional: Decimal::zero(),
                quantity_decimals: 0,
            },
        );
        let order = build_order(
            &template(AssetClass::Stock, "100"),
            &AccountId::new("acct-1"),
            &BrokerId::new("zerodha"),
            d("2550"),
            &registry,
        )
        .unwrap();
        // 25.5 -> 25 -> 2 lots of 10.
        assert_eq!(order.quantity, d("20"));
    }

    #[test]
    fn test_min_tradeable_notional() {
        let rule = PrecisionRule::default_for(AssetClass::Stock);
        assert_eq!(rule.min_tradeable_notional(d("235")), d("235"));

        let rule = PrecisionRule::default_for(AssetClass::Crypto);
        assert_eq!(rule.min_tradeable_notional(d("60000")), d("10"));
    }
}
