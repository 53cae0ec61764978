//! # Vault Errors
//!
//! The closed set of failures a vault operation can report. Each kind carries
//! a stable numeric code so harnesses and RPC clients can match on failures
//! without parsing messages.

use thiserror::Error;

use crate::{Amount, BlockHeight, ChallengeId};

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The caller does not hold the role this operation requires.
    #[error("not authorized")]
    NotAuthorized,

    /// Challenge ids start at 1.
    #[error("invalid challenge id")]
    InvalidChallenge,

    /// Deposits must be positive.
    #[error("invalid amount")]
    InvalidAmount,

    /// The vault or challenge is not in a state that allows this operation,
    /// or the challenge window is malformed.
    #[error("invalid status")]
    InvalidStatus,

    /// No challenge config, or no vault record, under the given key.
    #[error("challenge not found: {0}")]
    ChallengeNotFound(ChallengeId),

    /// The caller already holds a vault for this challenge.
    #[error("user already deposited into challenge {0}")]
    UserAlreadyDeposited(ChallengeId),

    /// Minimum deposit is zero, or the deposit is below the minimum.
    #[error("invalid minimum deposit")]
    InvalidMinDeposit,

    /// Maximum deposit is zero, or the deposit is above the maximum.
    #[error("invalid maximum deposit")]
    InvalidMaxDeposit,

    /// The caller reached the per-user deposit cap.
    #[error("max deposits exceeded: limit is {limit}")]
    MaxDepositsExceeded {
        /// Configured per-user cap.
        limit: u32,
    },

    /// The vault is still locked.
    #[error("lock period not ended: unlocks at {unlocks_at}, now {now}")]
    LockPeriodNotEnded {
        /// First height at which the vault may settle. `BlockHeight::MAX`
        /// when the unlock height is past the clock range.
        unlocks_at: BlockHeight,
        /// Height of the rejected call.
        now: BlockHeight,
    },

    /// The reward rounds to zero, or was already claimed.
    #[error("reward not available")]
    RewardNotAvailable,

    /// Governance already penalized this vault.
    #[error("penalty already enforced")]
    PenaltyAlreadyEnforced,

    /// Penalty rate above 100%.
    #[error("invalid penalty rate: {0}")]
    InvalidPenaltyRate(u32),

    /// Reward rate above 200%.
    #[error("invalid reward rate: {0}")]
    InvalidRewardRate(u32),

    /// Lock duration must be positive.
    #[error("invalid lock period")]
    InvalidLockPeriod,

    /// The challenge is inactive or outside its deposit window.
    #[error("challenge {0} not open for deposits")]
    ChallengeNotStarted(ChallengeId),

    /// Rate arithmetic would overflow the amount type.
    #[error("amount overflow: {amount} at rate {rate}%")]
    AmountOverflow {
        /// The locked amount being rated.
        amount: Amount,
        /// The percentage applied.
        rate: u32,
    },
}

impl VaultError {
    /// Stable numeric code for this error kind.
    pub fn code(&self) -> u32 {
        match self {
            VaultError::NotAuthorized => 100,
            VaultError::InvalidChallenge => 101,
            VaultError::InvalidAmount => 102,
            VaultError::InvalidStatus => 103,
            VaultError::ChallengeNotFound(_) => 105,
            VaultError::InvalidPenaltyRate(_) => 112,
            VaultError::InvalidRewardRate(_) => 113,
            VaultError::MaxDepositsExceeded { .. } => 114,
            VaultError::InvalidMinDeposit => 122,
            VaultError::InvalidMaxDeposit => 123,
            VaultError::ChallengeNotStarted(_) => 125,
            VaultError::UserAlreadyDeposited(_) => 126,
            VaultError::InvalidLockPeriod => 127,
            VaultError::LockPeriodNotEnded { .. } => 128,
            VaultError::RewardNotAvailable => 129,
            VaultError::PenaltyAlreadyEnforced => 130,
            VaultError::AmountOverflow { .. } => 131,
        }
    }
}
