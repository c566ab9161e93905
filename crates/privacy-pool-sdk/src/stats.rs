use serde::{Deserialize, Serialize};

use crate::amount::CoinUnits;
use crate::events::{DepositEvent, WithdrawalEvent};

/// Aggregate figures over the observed deposit and withdrawal events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_deposits: u64,
    pub total_withdrawals: u64,
    pub total_deposited: u128,
    pub total_withdrawn: u128,
    /// Deposited minus withdrawn, floored at zero.
    pub pool_balance: u128,
    /// Deposits not yet matched by a withdrawal.
    pub anonymity_set: u64,
    pub average_deposit: u64,
    pub last_deposit_at: u64,
    pub last_withdrawal_at: u64,
    pub formatted_balance: String,
    pub formatted_average_deposit: String,
}

pub fn compute_stats(
    deposits: &[DepositEvent],
    withdrawals: &[WithdrawalEvent],
    units: &CoinUnits,
) -> PoolStats {
    let total_deposited: u128 = deposits.iter().map(|d| d.amount as u128).sum();
    let total_withdrawn: u128 = withdrawals.iter().map(|w| w.amount as u128).sum();
    let pool_balance = total_deposited.saturating_sub(total_withdrawn);
    let average_deposit = if deposits.is_empty() {
        0
    } else {
        (total_deposited / deposits.len() as u128) as u64
    };

    PoolStats {
        total_deposits: deposits.len() as u64,
        total_withdrawals: withdrawals.len() as u64,
        total_deposited,
        total_withdrawn,
        pool_balance,
        anonymity_set: (deposits.len() as u64).saturating_sub(withdrawals.len() as u64),
        average_deposit,
        last_deposit_at: deposits.iter().map(|d| d.timestamp).max().unwrap_or(0),
        last_withdrawal_at: withdrawals.iter().map(|w| w.timestamp).max().unwrap_or(0),
        formatted_balance: format!(
            "{} {}",
            crate::amount::format_units(pool_balance, units.decimals),
            units.symbol
        ),
        formatted_average_deposit: units.format(average_deposit),
    }
}
