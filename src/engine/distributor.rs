//! Account eligibility and proportional capital distribution.
//!
//! Target capital is split across a fund's eligible accounts in proportion
//! to each account's available margin. Accounts that cannot carry even an
//! equal share of the target are filled to their cap first and the
//! remainder re-split among the rest, so no account is ever allocated past
//! its margin and the total never exceeds the target.

use crate::domain::{
    AccountId, AccountState, ActiveAllocation, AssetClass, BrokerId, Decimal, FundState,
    Instrument, RejectReason,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One account's slice of the target capital.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountAllocation {
    pub account_id: AccountId,
    pub broker: BrokerId,
    pub allocated_capital: Decimal,
}

/// Distribution knobs taken from the engine config.
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Cap on the share of fund equity routed through one broker,
    /// in percent.
    pub max_broker_allocation_pct: Decimal,
}

/// Filter the fund's accounts down to those this signal may use.
///
/// # Errors
/// `IncompatibleAssetClass` when no account in the fund supports the
/// asset class at all; `NoEligibleAccounts` when support exists but the
/// allocation's allowlist or symbol restrictions exclude every account.
pub fn eligible_accounts<'a>(
    fund: &'a FundState,
    allocation: &ActiveAllocation,
    asset_class: AssetClass,
    instrument: &Instrument,
) -> Result<Vec<&'a AccountState>, RejectReason> {
    if !fund.accounts.iter().any(|a| a.supports_class(asset_class)) {
        return Err(RejectReason::IncompatibleAssetClass);
    }

    let eligible: Vec<&AccountState> = fund
        .accounts
        .iter()
        .filter(|account| account.fund_id == fund.fund_id)
        .filter(|account| allocation.permits_account(&account.account_id))
        .filter(|account| account.supports(asset_class, instrument))
        .filter(|account| account.available_margin.is_positive())
        .collect();

    if eligible.is_empty() {
        return Err(RejectReason::NoEligibleAccounts);
    }
    Ok(eligible)
}

/// Split `target_capital` across the accounts proportionally to available
/// margin, capped per account and per broker.
///
/// Guarantees: Σ allocations ≤ target_capital (within cent rounding), no
/// allocation exceeds its account's available margin, and accounts whose
/// cap is below an equal share are filled to the cap before the remainder
/// is re-split.
pub fn distribute(
    accounts: &[&AccountState],
    target_capital: Decimal,
    total_equity: Decimal,
    config: &DistributorConfig,
) -> Vec<AccountAllocation> {
    if accounts.is_empty() || !target_capital.is_positive() {
        return Vec::new();
    }

    let broker_cap = total_equity * config.max_broker_allocation_pct / Decimal::hundred();
    let mut broker_headroom: HashMap<&BrokerId, Decimal> = HashMap::new();
    for account in accounts {
        broker_headroom.entry(&account.broker).or_insert(broker_cap);
    }

    let cap_of = |account: &AccountState, headroom: &HashMap<&BrokerId, Decimal>| {
        let broker_left = headroom
            .get(&account.broker)
            .copied()
            .unwrap_or(Decimal::zero());
        account.available_margin.min(broker_left).max(Decimal::zero())
    };

    let mut remaining = target_capital;
    let mut pool: Vec<&AccountState> = accounts.to_vec();
    let mut allocations: Vec<AccountAllocation> = Vec::new();

    // Constrained pass: fill margin-bound accounts to their cap until every
    // remaining account can carry an equal share of what is left.
    loop {
        if pool.is_empty() || !remaining.is_positive() {
            break;
        }
        let equal_share = remaining / Decimal::from_i64(pool.len() as i64);
        let constrained: Vec<&AccountState> = pool
            .iter()
            .copied()
            .filter(|a| cap_of(a, &broker_headroom) < equal_share)
            .collect();
        if constrained.is_empty() {
            break;
        }
        for account in constrained {
            // Rounded down: a fractional-cent cap must not round past the
            // account's margin or the broker headroom.
            let amount = cap_of(account, &broker_headroom)
                .min(remaining)
                .round_down_dp(2);
            if amount.is_positive() {
                if let Some(headroom) = broker_headroom.get_mut(&account.broker) {
                    *headroom = *headroom - amount;
                }
                remaining = remaining - amount;
                allocations.push(AccountAllocation {
                    account_id: account.account_id.clone(),
                    broker: account.broker.clone(),
                    allocated_capital: amount,
                });
            }
            pool.retain(|a| a.account_id != account.account_id);
        }
    }

    // Proportional pass over the unconstrained remainder; the last account
    // takes the exact residue so the total lands on the target.
    if remaining.is_positive() && !pool.is_empty() {
        let total_margin: Decimal = pool.iter().map(|a| a.available_margin).sum();
        let mut distributed = Decimal::zero();
        for (idx, account) in pool.iter().enumerate() {
            let cap = cap_of(account, &broker_headroom);
            let share = if idx + 1 == pool.len() {
                (remaining - distributed).round_down_dp(2)
            } else {
                ((account.available_margin / total_margin) * remaining).round_cents()
            };
            let amount = share.min(cap);
            if amount.is_positive() {
                if let Some(headroom) = broker_headroom.get_mut(&account.broker) {
                    *headroom = *headroom - amount;
                }
                distributed = distributed + amount;
                allocations.push(AccountAllocation {
                    account_id: account.account_id.clone(),
                    broker: account.broker.clone(),
                    allocated_capital: amount,
                });
            }
        }
        remaining = remaining - distributed;
    }

    if remaining.round_cents().is_positive() {
        warn!(
            shortfall = %remaining.round_cents(),
            target = %target_capital,
            "account caps truncated distribution below target"
        );
    }

    debug!(
        target = %target_capital,
        accounts = allocations.len(),
        "distributed target capital"
    );
    allocations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetClassSupport, FundId};
    use std::collections::HashMap as Map;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn account(id: &str, broker: &str, margin: &str) -> AccountState {
        let mut support = Map::new();
        support.insert(AssetClass::Stock, AssetClassSupport::All);
        AccountState {
            account_id: AccountId::new(id),
            fund_id: FundId::new("fund-1"),
            broker: BrokerId::new(broker),
            equity: d(margin),
            available_margin: d(margin),
            asset_class_support: support,
        }
    }

    fn config() -> DistributorConfig {
        DistributorConfig {
            max_broker_allocation_pct: d("100"),
        }
    }

    fn fund(accounts: Vec<AccountState>) -> FundState {
        FundState {
            fund_id: FundId::new("fund-1"),
            total_equity: d("1000000"),
            status: crate::domain::FundStatus::Active,
            accounts,
        }
    }

    fn allocation() -> ActiveAllocation {
        ActiveAllocation {
            allocation_id: "alloc-1".to_string(),
            fund_id: FundId::new("fund-1"),
            weight_pct: d("10"),
            allowed_accounts: None,
        }
    }

    #[test]
    fn test_proportional_split_by_available_margin() {
        let a1 = account("acct-1", "ibkr", "15000");
        let a2 = account("acct-2", "ibkr", "8000");
        let allocations = distribute(&[&a1, &a2], d("15000"), d("1000000"), &config());

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].allocated_capital, d("9782.61"));
        assert_eq!(allocations[1].allocated_capital, d("5217.39"));
    }

    #[test]
    fn test_margin_bound_account_filled_to_cap_then_remainder_resplit() {
        let a1 = account("acct-1", "ibkr", "2000");
        let a2 = account("acct-2", "ibkr", "15000");
        let allocations = distribute(&[&a1, &a2], d("15000"), d("1000000"), &config());

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].account_id, AccountId::new("acct-1"));
        assert_eq!(allocations[0].allocated_capital, d("2000"));
        assert_eq!(allocations[1].allocated_capital, d("13000"));
    }

    #[test]
    fn test_total_never_exceeds_target_or_account_margin() {
        let a1 = account("acct-1", "ibkr", "4000");
        let a2 = account("acct-2", "zerodha", "9000");
        let a3 = account("acct-3", "ibkr", "1500");
        let accounts = [&a1, &a2, &a3];
        let target = d("12000");
        let allocations = distribute(&accounts, target, d("1000000"), &config());

        let total: Decimal = allocations.iter().map(|a| a.allocated_capital).sum();
        assert!(total <= target);
        for allocation in &allocations {
            let margin = accounts
                .iter()
                .find(|a| a.account_id == allocation.account_id)
                .unwrap()
                .available_margin;
            assert!(allocation.allocated_capital <= margin);
        }
    }

    #[test]
    fn test_target_above_total_margin_fills_all_caps() {
        let a1 = account("acct-1", "ibkr", "3000");
        let a2 = account("acct-2", "ibkr", "5000");
        let allocations = distribute(&[&a1, &a2], d("20000"), d("1000000"), &config());

        let total: Decimal = allocations.iter().map(|a| a.allocated_capital).sum();
        assert_eq!(total, d("8000"));
    }

    #[test]
    fn test_fractional_cent_cap_never_rounds_past_margin() {
        let a1 = account("acct-1", "ibkr", "1999.996");
        let a2 = account("acct-2", "ibkr", "15000");
        let allocations = distribute(&[&a1, &a2], d("15000"), d("1000000"), &config());

        let capped = allocations
            .iter()
            .find(|a| a.account_id == AccountId::new("acct-1"))
            .unwrap();
        assert!(capped.allocated_capital <= d("1999.996"));
        assert_eq!(capped.allocated_capital, d("1999.99"));

        let total: Decimal = allocations.iter().map(|a| a.allocated_capital).sum();
        assert!(total <= d("15000"));
    }

    #[test]
    fn test_broker_cap_limits_single_broker_share() {
        let a1 = account("acct-1", "ibkr", "50000");
        let a2 = account("acct-2", "zerodha", "50000");
        let config = DistributorConfig {
            max_broker_allocation_pct: d("40"),
        };
        // 40% of 20000 equity = 8000 per broker.
        let allocations = distribute(&[&a1, &a2], d("15000"), d("20000"), &config);

        for allocation in &allocations {
            assert!(allocation.allocated_capital <= d("8000"));
        }
    }

    #[test]
    fn test_eligibility_requires_class_support() {
        let mut a1 = account("acct-1", "ibkr", "5000");
        a1.asset_class_support.clear();
        let fund = fund(vec![a1]);
        let err = eligible_accounts(
            &fund,
            &allocation(),
            AssetClass::Stock,
            &Instrument::new("AAPL"),
        )
        .unwrap_err();
        assert_eq!(err, RejectReason::IncompatibleAssetClass);
    }

    #[test]
    fn test_eligibility_respects_account_allowlist() {
        let fund = fund(vec![
            account("acct-1", "ibkr", "5000"),
            account("acct-2", "ibkr", "5000"),
        ]);
        let mut allocation = allocation();
        let mut allowed = std::collections::HashSet::new();
        allowed.insert(AccountId::new("acct-2"));
        allocation.allowed_accounts = Some(allowed);

        let eligible = eligible_accounts(
            &fund,
            &allocation,
            AssetClass::Stock,
            &Instrument::new("AAPL"),
        )
        .unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].account_id, AccountId::new("acct-2"));
    }

    #[test]
    fn test_eligibility_symbol_allowlist_excludes_all() {
        let mut a1 = account("acct-1", "ibkr", "5000");
        let mut symbols = std::collections::HashSet::new();
        symbols.insert(Instrument::new("MSFT"));
        a1.asset_class_support
            .insert(AssetClass::Stock, AssetClassSupport::Symbols(symbols));
        let fund = fund(vec![a1]);

        let err = eligible_accounts(
            &fund,
            &allocation(),
            AssetClass::Stock,
            &Instrument::new("AAPL"),
        )
        .unwrap_err();
        assert_eq!(err, RejectReason::NoEligibleAccounts);
    }

    #[test]
    fn test_zero_margin_accounts_are_skipped() {
        let fund = fund(vec![
            account("acct-1", "ibkr", "0"),
            account("acct-2", "ibkr", "5000"),
        ]);
        let eligible = eligible_accounts(
            &fund,
            &allocation(),
            AssetClass::Stock,
            &Instrument::new("AAPL"),
        )
        .unwrap();
        assert_eq!(eligible.len(), 1);
    }
}
