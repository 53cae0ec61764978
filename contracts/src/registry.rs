//! # Challenge Registry
//!
//! Stores one [`ChallengeConfig`] per challenge id. Configs are written only
//! by the authority (the check lives in [`crate::vault::SavingsVault`]),
//! never deleted, and immutable apart from the `active` flag. Writing the
//! same id again replaces the whole record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{apply_rate, MAX_PENALTY_RATE, MAX_REWARD_RATE};
use crate::error::VaultError;
use crate::{Amount, BlockHeight, ChallengeId};

/// Parameters submitted by the authority when configuring a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeParams {
    /// Smallest admissible deposit.
    pub min_deposit: Amount,
    /// Largest admissible deposit. Not cross-checked against `min_deposit`.
    pub max_deposit: Amount,
    /// Percentage of the locked amount forfeited on failure (0–100).
    pub penalty_rate: u32,
    /// Percentage of the locked amount paid as reward on completion (0–200).
    pub reward_rate: u32,
    /// Ticks a deposit stays locked before it may settle.
    pub lock_duration: u64,
    /// First height at which deposits are admitted.
    pub start_time: BlockHeight,
    /// Last height at which deposits are admitted.
    pub end_time: BlockHeight,
}

impl ChallengeParams {
    /// Checks the parameters in contract order, reporting the first failure.
    ///
    /// `now` is the height of the configuring call; the deposit window may
    /// not start or end in the past.
    pub fn validate(&self, challenge_id: ChallengeId, now: BlockHeight) -> Result<(), VaultError> {
        if challenge_id == 0 {
            return Err(VaultError::InvalidChallenge);
        }
        if self.min_deposit == 0 {
            return Err(VaultError::InvalidMinDeposit);
        }
        if self.max_deposit == 0 {
            return Err(VaultError::InvalidMaxDeposit);
        }
        if self.penalty_rate > MAX_PENALTY_RATE {
            return Err(VaultError::InvalidPenaltyRate(self.penalty_rate));
        }
        if self.reward_rate > MAX_REWARD_RATE {
            return Err(VaultError::InvalidRewardRate(self.reward_rate));
        }
        if self.lock_duration == 0 {
            return Err(VaultError::InvalidLockPeriod);
        }
        if self.start_time < now || self.end_time < now {
            return Err(VaultError::InvalidStatus);
        }
        if self.end_time <= self.start_time {
            return Err(VaultError::InvalidStatus);
        }
        Ok(())
    }
}

/// A stored challenge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Parameters as submitted by the authority.
    pub params: ChallengeParams,
    /// Deposits are admitted only while set.
    pub active: bool,
}

impl ChallengeConfig {
    /// Whether a deposit at `now` falls inside an open window.
    pub fn accepts_deposits_at(&self, now: BlockHeight) -> bool {
        self.active && now >= self.params.start_time && now <= self.params.end_time
    }

    /// Reward owed on a completed vault holding `locked`, rounded down.
    pub fn reward_for(&self, locked: Amount) -> Result<Amount, VaultError> {
        let rate = self.params.reward_rate;
        apply_rate(locked, rate).ok_or(VaultError::AmountOverflow { amount: locked, rate })
    }

    /// Penalty forfeited by a failed vault holding `locked`, rounded down.
    pub fn penalty_for(&self, locked: Amount) -> Result<Amount, VaultError> {
        let rate = self.params.penalty_rate;
        apply_rate(locked, rate).ok_or(VaultError::AmountOverflow { amount: locked, rate })
    }
}

/// All configured challenges, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRegistry {
    configs: BTreeMap<ChallengeId, ChallengeConfig>,
}

impl ConfigRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `params` and writes them as an active config, replacing any
    /// previous config under `challenge_id`.
    pub fn configure(
        &mut self,
        challenge_id: ChallengeId,
        params: ChallengeParams,
        now: BlockHeight,
    ) -> Result<(), VaultError> {
        params.validate(challenge_id, now)?;
        let replaced = self
            .configs
            .insert(challenge_id, ChallengeConfig { params, active: true })
            .is_some();
        tracing::debug!(challenge_id, replaced, "challenge configured");
        Ok(())
    }

    /// Clears the `active` flag. Existing vaults keep settling normally.
    pub fn deactivate(&mut self, challenge_id: ChallengeId) -> Result<(), VaultError> {
        let config = self
            .configs
            .get_mut(&challenge_id)
            .ok_or(VaultError::ChallengeNotFound(challenge_id))?;
        config.active = false;
        tracing::debug!(challenge_id, "challenge deactivated");
        Ok(())
    }

    /// Looks up a config.
    pub fn get(&self, challenge_id: ChallengeId) -> Option<&ChallengeConfig> {
        self.configs.get(&challenge_id)
    }

    /// Looks up a config, failing with [`VaultError::ChallengeNotFound`].
    pub fn require(&self, challenge_id: ChallengeId) -> Result<&ChallengeConfig, VaultError> {
        self.get(challenge_id)
            .ok_or(VaultError::ChallengeNotFound(challenge_id))
    }

    /// Iterates configs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ChallengeId, &ChallengeConfig)> {
        self.configs.iter().map(|(id, c)| (*id, c))
    }

    /// Number of configured challenges.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether no challenge has been configured.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ChallengeParams {
        ChallengeParams {
            min_deposit: 100,
            max_deposit: 1000,
            penalty_rate: 10,
            reward_rate: 20,
            lock_duration: 30,
            start_time: 10,
            end_time: 100,
        }
    }

    #[test]
    fn configure_stores_active_config() {
        let mut registry = ConfigRegistry::new();
        registry.configure(1, params(), 0).unwrap();
        let config = registry.get(1).unwrap();
        assert_eq!(config.params, params());
        assert!(config.active);
    }

    #[test]
    fn reconfigure_overwrites_and_reactivates() {
        let mut registry = ConfigRegistry::new();
        registry.configure(1, params(), 0).unwrap();
        registry.deactivate(1).unwrap();

        let updated = ChallengeParams { reward_rate: 50, ..params() };
        registry.configure(1, updated, 0).unwrap();
        let config = registry.get(1).unwrap();
        assert_eq!(config.params.reward_rate, 50);
        assert!(config.active);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn validation_order() {
        let p = params();
        assert_eq!(p.validate(0, 0), Err(VaultError::InvalidChallenge));

        // Zero challenge id wins over every other defect.
        let broken = ChallengeParams { min_deposit: 0, max_deposit: 0, ..p };
        assert_eq!(broken.validate(0, 0), Err(VaultError::InvalidChallenge));
        assert_eq!(broken.validate(1, 0), Err(VaultError::InvalidMinDeposit));

        let broken = ChallengeParams { max_deposit: 0, penalty_rate: 101, ..p };
        assert_eq!(broken.validate(1, 0), Err(VaultError::InvalidMaxDeposit));

        let broken = ChallengeParams { penalty_rate: 101, reward_rate: 201, ..p };
        assert_eq!(broken.validate(1, 0), Err(VaultError::InvalidPenaltyRate(101)));

        let broken = ChallengeParams { reward_rate: 201, lock_duration: 0, ..p };
        assert_eq!(broken.validate(1, 0), Err(VaultError::InvalidRewardRate(201)));

        let broken = ChallengeParams { lock_duration: 0, start_time: 0, ..p };
        assert_eq!(broken.validate(1, 5), Err(VaultError::InvalidLockPeriod));
    }

    #[test]
    fn rate_boundaries_accepted() {
        let p = ChallengeParams { penalty_rate: 100, reward_rate: 200, ..params() };
        assert!(p.validate(1, 0).is_ok());
        let p = ChallengeParams { penalty_rate: 0, reward_rate: 0, ..params() };
        assert!(p.validate(1, 0).is_ok());
    }

    #[test]
    fn window_must_be_in_future_and_ordered() {
        let p = params();
        assert_eq!(p.validate(1, 11), Err(VaultError::InvalidStatus));
        assert_eq!(p.validate(1, 101), Err(VaultError::InvalidStatus));
        assert!(p.validate(1, 10).is_ok());

        let empty = ChallengeParams { start_time: 50, end_time: 50, ..p };
        assert_eq!(empty.validate(1, 0), Err(VaultError::InvalidStatus));
        let inverted = ChallengeParams { start_time: 60, end_time: 50, ..p };
        assert_eq!(inverted.validate(1, 0), Err(VaultError::InvalidStatus));
    }

    #[test]
    fn min_above_max_is_permitted() {
        let p = ChallengeParams { min_deposit: 2000, max_deposit: 1000, ..params() };
        assert!(p.validate(1, 0).is_ok());
    }

    #[test]
    fn deactivate_missing_challenge() {
        let mut registry = ConfigRegistry::new();
        assert_eq!(registry.deactivate(7), Err(VaultError::ChallengeNotFound(7)));
    }

    #[test]
    fn deactivate_keeps_parameters() {
        let mut registry = ConfigRegistry::new();
        registry.configure(1, params(), 0).unwrap();
        registry.deactivate(1).unwrap();
        let config = registry.get(1).unwrap();
        assert!(!config.active);
        assert_eq!(config.params, params());
    }

    #[test]
    fn deposit_window_is_inclusive() {
        let config = ChallengeConfig { params: params(), active: true };
        assert!(!config.accepts_deposits_at(9));
        assert!(config.accepts_deposits_at(10));
        assert!(config.accepts_deposits_at(100));
        assert!(!config.accepts_deposits_at(101));

        let inactive = ChallengeConfig { active: false, ..config };
        assert!(!inactive.accepts_deposits_at(50));
    }
}
