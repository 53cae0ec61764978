//! # Contract Constants
//!
//! Rate ceilings and default limits. Rates are whole percentages applied
//! with floor division against [`PERCENT_SCALE`].

/// Denominator for every rate in the contract.
pub const PERCENT_SCALE: u32 = 100;

/// Highest accepted penalty rate. A failed vault can forfeit at most the
/// whole locked amount.
pub const MAX_PENALTY_RATE: u32 = 100;

/// Highest accepted reward rate. A completed vault earns at most twice its
/// locked amount in reward tokens.
pub const MAX_REWARD_RATE: u32 = 200;

/// Default cap on admitted deposits per principal, across all challenges.
pub const DEFAULT_MAX_DEPOSITS_PER_USER: u32 = 1_000;

/// Applies a whole-percentage `rate` to `amount`, rounding down.
///
/// Returns `None` if the result does not fit in a `u64`. With rates capped at
/// [`MAX_REWARD_RATE`] that only happens for amounts above `u64::MAX / 2`.
pub fn apply_rate(amount: u64, rate: u32) -> Option<u64> {
    let scaled = (amount as u128).checked_mul(rate as u128)? / PERCENT_SCALE as u128;
    u64::try_from(scaled).ok()
}
