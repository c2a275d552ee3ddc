//! Position sizing: how much capital a fund commits to an entry signal.
//!
//! Exit signals never pass through here; they close 100% of the open
//! position by construction.

use crate::domain::{Decimal, RejectReason};
use tracing::debug;

/// Inputs the sizer needs, gathered by the orchestrator.
#[derive(Debug, Clone)]
pub struct SizingInputs {
    /// Cash notional the strategy requested.
    pub requested_capital: Decimal,
    /// Strategy's available capital in this fund (allocated minus used).
    pub available_capital: Decimal,
    /// Fund total equity, the base for the position-size cap.
    pub total_equity: Decimal,
    /// margin_required / notional for this order shape.
    pub margin_ratio: Decimal,
    /// Haircut applied on top of the margin ratio (e.g. 0.30).
    pub slippage_buffer: Decimal,
    /// Maximum position size as a percentage of fund equity (e.g. 10).
    pub max_position_pct: Decimal,
    /// Smallest notional the instrument can trade (min quantity at the
    /// reference price).
    pub min_tradeable_notional: Decimal,
}

/// Compute the target capital for an entry signal.
///
/// target = min(requested, available / (margin_ratio × (1 + buffer)),
///              equity × max_pct / 100, available)
///
/// # Errors
/// `InsufficientCapital` when nothing is available;
/// `BelowMinTradeableSize` when the target cannot buy the instrument's
/// minimum unit (never rounded up).
pub fn size_entry(inputs: &SizingInputs) -> Result<Decimal, RejectReason> {
    if !inputs.available_capital.is_positive() {
        return Err(RejectReason::InsufficientCapital);
    }

    let buffered_ratio = inputs.margin_ratio * (Decimal::one() + inputs.slippage_buffer);
    let margin_capped = if buffered_ratio.is_positive() {
        inputs.available_capital / buffered_ratio
    } else {
        inputs.available_capital
    };
    let max_allowed = inputs.total_equity * inputs.max_position_pct / Decimal::hundred();

    let target = inputs
        .requested_capital
        .min(margin_capped)
        .min(max_allowed)
        .min(inputs.available_capital);

    debug!(
        requested = %inputs.requested_capital,
        margin_capped = %margin_capped,
        max_allowed = %max_allowed,
        available = %inputs.available_capital,
        target = %target,
        "sized entry signal"
    );

    if !target.is_positive() || target < inputs.min_tradeable_notional {
        return Err(RejectReason::BelowMinTradeableSize);
    }

    Ok(target)
}
