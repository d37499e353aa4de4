//! House fee on settled wagers
//!
//! The fee is `trunc(stake * fee_rate)` and is burned: the winner receives
//! `2 * stake - fee`, which is their own stake back plus the loser's stake
//! minus the fee. Truncation means the fee never exceeds the exact product.
//!
//! Rates are validated when they are configured (see [`crate::settings`]);
//! [`compute`] trusts its input.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee and prize for one stake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Stake each participant risks
    pub stake: u64,
    /// Coins removed from circulation
    pub fee: u64,
    /// Gross amount paid to the winner, including their own stake
    pub prize: u64,
}

impl FeeQuote {
    /// What the winner gains net of their own stake
    pub fn net_gain(&self) -> u64 {
        self.prize - self.stake
    }
}

/// Compute the fee and prize for `stake` at `fee_rate`
pub fn compute(stake: u64, fee_rate: f64) -> FeeQuote {
    let fee = (Decimal::from(stake) * rate_to_decimal(fee_rate))
        .trunc()
        .to_u64()
        .unwrap_or(0)
        .min(stake);
    let prize = (stake as u128 * 2 - fee as u128).min(u64::MAX as u128) as u64;

    FeeQuote { stake, fee, prize }
}

/// Exact decimal form of a rate as it was written (0.29 stays 0.29)
fn rate_to_decimal(rate: f64) -> Decimal {
    rate.to_string()
        .parse::<Decimal>()
        .or_else(|_| Decimal::try_from(rate))
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
        .min(Decimal::ONE)
}
