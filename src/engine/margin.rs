//! Per-asset-class margin requirement factory.
//!
//! Pure computation: all broker-supplied inputs (futures initial margin,
//! forex pair percentages, crypto leverage) arrive in a `BrokerContext`
//! assembled by the orchestrator before the call, so every policy here is
//! a function of its arguments only.

use crate::domain::{AssetClass, Decimal};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarginError {
    #[error("unsupported asset class: {0}")]
    UnsupportedAssetClass(String),
    #[error("margin data unavailable: {0}")]
    DataUnavailable(String),
}

/// Broker-supplied inputs for margin policies that need them.
///
/// Fields are optional; a policy that needs a missing field fails with
/// `MarginError::DataUnavailable` rather than guessing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerContext {
    /// Initial margin per contract, from the broker's margin preview
    /// (futures only).
    pub futures_initial_margin: Option<Decimal>,
    /// Pair-specific margin percentage, typically 0.02..=0.05 (forex only).
    pub forex_pair_margin_pct: Option<Decimal>,
    /// Leverage the broker extends on crypto collateral; absent means 1
    /// (fully collateralized).
    pub crypto_leverage: Option<Decimal>,
    /// Flat percentage standing in for SPAN-style portfolio margin
    /// (options only); absent means the 20% default.
    pub option_margin_pct: Option<Decimal>,
}

/// Margin requirement for an order shape, plus the ratio the sizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginQuote {
    /// Monetary margin the broker will demand, >= 0.
    pub margin_required: Decimal,
    /// margin_required / notional, in (0, 1].
    pub margin_ratio: Decimal,
}

/// Default stand-in for SPAN portfolio margin on options. A flat notional
/// percentage is a known approximation; the real calculation requires the
/// full Greeks surface and lives behind `BrokerContext.option_margin_pct`.
fn default_option_margin_pct() -> Decimal {
    Decimal::from_str_canonical("0.20").unwrap_or_default()
}

fn stock_margin_ratio() -> Decimal {
    // Standard Reg-T style 2x leverage.
    Decimal::from_str_canonical("0.5").unwrap_or_default()
}

/// Compute the margin required to carry `quantity` units at `price`.
///
/// # Errors
/// `DataUnavailable` when the context lacks a field the asset class's
/// policy requires; `UnsupportedAssetClass` is reserved for classes the
/// factory does not model (none today, but rejections map through it).
pub fn required_margin(
    asset_class: AssetClass,
    quantity: Decimal,
    price: Decimal,
    context: &BrokerContext,
) -> Result<MarginQuote, MarginError> {
    let notional = quantity * price;
    if !notional.is_positive() {
        return Err(MarginError::DataUnavailable(
            "order notional must be positive".to_string(),
        ));
    }

    let margin_required = match asset_class {
        AssetClass::Stock => notional * stock_margin_ratio(),
        AssetClass::Future => {
            let per_contract = context.futures_initial_margin.ok_or_else(|| {
                MarginError::DataUnavailable(
                    "no initial margin preview for futures contract".to_string(),
                )
            })?;
            if per_contract.is_negative() {
                return Err(MarginError::DataUnavailable(
                    "broker returned negative initial margin".to_string(),
                ));
            }
            per_contract * quantity
        }
        AssetClass::Forex => {
            let pct = context.forex_pair_margin_pct.ok_or_else(|| {
                MarginError::DataUnavailable("no margin percentage for pair".to_string())
            })?;
            if !pct.is_positive() || pct > Decimal::one() {
                return Err(MarginError::DataUnavailable(format!(
                    "pair margin percentage out of range: {}",
                    pct
                )));
            }
            notional * pct
        }
        AssetClass::Crypto => {
            // Collateral-based: full notional unless the broker extends
            // leverage.
            let leverage = context.crypto_leverage.unwrap_or_else(Decimal::one);
            if !leverage.is_positive() {
                return Err(MarginError::DataUnavailable(format!(
                    "invalid crypto leverage: {}",
                    leverage
                )));
            }
            notional / leverage
        }
        AssetClass::Option => {
            let pct = context
                .option_margin_pct
                .unwrap_or_else(default_option_margin_pct);
            if !pct.is_positive() || pct > Decimal::one() {
                return Err(MarginError::DataUnavailable(format!(
                    "option margin percentage out of range: {}",
                    pct
                )));
            }
            notional * pct
        }
    };

    Ok(MarginQuote {
        margin_required,
        margin_ratio: margin_required / notional,
    })
}
