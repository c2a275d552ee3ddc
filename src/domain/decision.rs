//! The decision audit record and the rejection taxonomy.
//!
//! Rejections are data, not exceptions: a signal can be approved for one
//! fund and rejected for another, so reasons travel per fund inside the
//! decision rather than aborting the pipeline.

use super::order::Order;
use super::primitives::{FundId, SignalId};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Why a signal (or one fund's slice of it) produced no orders.
///
/// Each variant has a stable code string used in persistence and JSON;
/// the Display form is the human-readable audit message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("malformed signal: {0}")]
    MalformedSignal(String),
    #[error("no active allocation references this strategy")]
    NoActiveAllocation,
    #[error("fund is not active")]
    FundNotActive,
    #[error("open position already exists in the same direction")]
    DuplicateEntry,
    #[error("open position exists in the opposite direction; exit first")]
    MustExitFirst,
    #[error("no open position to exit")]
    NoOpenPosition,
    #[error("no capital available for this strategy")]
    InsufficientCapital,
    #[error("sized capital is below the minimum tradeable size")]
    BelowMinTradeableSize,
    #[error("no account in the fund supports this asset class")]
    IncompatibleAssetClass,
    #[error("no eligible account for this signal")]
    NoEligibleAccounts,
    #[error("unsupported asset class: {0}")]
    UnsupportedAssetClass(String),
    #[error("margin data unavailable: {0}")]
    MarginDataUnavailable(String),
    #[error("account data unavailable: {0}")]
    AccountDataUnavailable(String),
    #[error("processing deadline exceeded")]
    Timeout,
}

impl RejectReason {
    /// Stable code for persistence and API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MalformedSignal(_) => "MALFORMED_SIGNAL",
            RejectReason::NoActiveAllocation => "NO_ACTIVE_ALLOCATION",
            RejectReason::FundNotActive => "FUND_NOT_ACTIVE",
            RejectReason::DuplicateEntry => "DUPLICATE_ENTRY",
            RejectReason::MustExitFirst => "MUST_EXIT_FIRST",
            RejectReason::NoOpenPosition => "NO_OPEN_POSITION",
            RejectReason::InsufficientCapital => "INSUFFICIENT_CAPITAL",
            RejectReason::BelowMinTradeableSize => "BELOW_MIN_TRADEABLE_SIZE",
            RejectReason::IncompatibleAssetClass => "INCOMPATIBLE_ASSET_CLASS",
            RejectReason::NoEligibleAccounts => "NO_ELIGIBLE_ACCOUNTS",
            RejectReason::UnsupportedAssetClass(_) => "UNSUPPORTED_ASSET_CLASS",
            RejectReason::MarginDataUnavailable(_) => "MARGIN_DATA_UNAVAILABLE",
            RejectReason::AccountDataUnavailable(_) => "ACCOUNT_DATA_UNAVAILABLE",
            RejectReason::Timeout => "TIMEOUT",
        }
    }

    /// Rebuild a reason from its stored (code, message) pair.
    ///
    /// Detail-carrying variants keep the full stored message as their
    /// detail; the prefix duplication is harmless for audit purposes.
    pub fn from_parts(code: &str, message: &str) -> Option<RejectReason> {
        let reason = match code {
            "MALFORMED_SIGNAL" => RejectReason::MalformedSignal(message.to_string()),
            "NO_ACTIVE_ALLOCATION" => RejectReason::NoActiveAllocation,
            "FUND_NOT_ACTIVE" => RejectReason::FundNotActive,
            "DUPLICATE_ENTRY" => RejectReason::DuplicateEntry,
            "MUST_EXIT_FIRST" => RejectReason::MustExitFirst,
            "NO_OPEN_POSITION" => RejectReason::NoOpenPosition,
            "INSUFFICIENT_CAPITAL" => RejectReason::InsufficientCapital,
            "BELOW_MIN_TRADEABLE_SIZE" => RejectReason::BelowMinTradeableSize,
            "INCOMPATIBLE_ASSET_CLASS" => RejectReason::IncompatibleAssetClass,
            "NO_ELIGIBLE_ACCOUNTS" => RejectReason::NoEligibleAccounts,
            "UNSUPPORTED_ASSET_CLASS" => RejectReason::UnsupportedAssetClass(message.to_string()),
            "MARGIN_DATA_UNAVAILABLE" => RejectReason::MarginDataUnavailable(message.to_string()),
            "ACCOUNT_DATA_UNAVAILABLE" => {
                RejectReason::AccountDataUnavailable(message.to_string())
            }
            "TIMEOUT" => RejectReason::Timeout,
            _ => return None,
        };
        Some(reason)
    }
}

#[derive(Serialize, Deserialize)]
struct ReasonRepr {
    code: String,
    message: String,
}

impl Serialize for RejectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReasonRepr {
            code: self.code().to_string(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RejectReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ReasonRepr::deserialize(deserializer)?;
        RejectReason::from_parts(&repr.code, &repr.message)
            .ok_or_else(|| D::Error::custom(format!("unknown reject code: {}", repr.code)))
    }
}

/// Terminal verdict for a signal or for one fund's slice of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Verdict> {
        match s {
            "approved" => Some(Verdict::Approved),
            "rejected" => Some(Verdict::Rejected),
            _ => None,
        }
    }
}

/// How one fund resolved the signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundOutcome {
    pub fund_id: FundId,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    pub orders: Vec<Order>,
}

impl FundOutcome {
    pub fn approved(fund_id: FundId, orders: Vec<Order>) -> Self {
        FundOutcome {
            fund_id,
            verdict: Verdict::Approved,
            reason: None,
            orders,
        }
    }

    pub fn rejected(fund_id: FundId, reason: RejectReason) -> Self {
        FundOutcome {
            fund_id,
            verdict: Verdict::Rejected,
            reason: Some(reason),
            orders: Vec::new(),
        }
    }
}

/// Immutable audit record of how a signal was resolved, unique per
/// signal_id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub signal_id: SignalId,
    pub verdict: Verdict,
    /// Signal-level rejection (malformed, no active allocation); per-fund
    /// rejections live in `outcomes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    pub outcomes: Vec<FundOutcome>,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

impl Decision {
    /// Approved iff at least one order was produced across all funds.
    pub fn from_outcomes(signal_id: SignalId, outcomes: Vec<FundOutcome>) -> Self {
        let any_orders = outcomes.iter().any(|o| !o.orders.is_empty());
        Decision {
            signal_id,
            verdict: if any_orders {
                Verdict::Approved
            } else {
                Verdict::Rejected
            },
            reason: None,
            outcomes,
            decided_at: chrono::Utc::now(),
        }
    }

    /// A signal-level rejection with no per-fund outcomes.
    pub fn rejected(signal_id: SignalId, reason: RejectReason) -> Self {
        Decision {
            signal_id,
            verdict: Verdict::Rejected,
            reason: Some(reason),
            outcomes: Vec::new(),
            decided_at: chrono::Utc::now(),
        }
    }

    /// All orders produced across every fund outcome.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.outcomes.iter().flat_map(|o| o.orders.iter())
    }
}
