//! # Savings Vault
//!
//! The vault state machine. Each user holds at most one [`VaultRecord`] per
//! challenge; its lifecycle is:
//!
//! ```text
//!                 withdraw_on_completion()            claim_reward()
//! deposit() ──▶ Active ────────────────────▶ Completed ──────────────▶ (reward_claimed)
//!                 │
//!                 └── enforce_penalty() ──▶ Failed (penalty_enforced)
//! ```
//!
//! `Completed` and `Failed` are terminal and mutually exclusive. The locked
//! amount never changes after admission.
//!
//! Every operation runs all of its checks before touching state, so a
//! rejected call leaves the vault exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::access::{AdminState, Principal, Role};
use crate::config::DEFAULT_MAX_DEPOSITS_PER_USER;
use crate::error::VaultError;
use crate::registry::{ChallengeParams, ConfigRegistry};
use crate::transfer::{Asset, Party, Transfer, TransferLedger};
use crate::{Amount, BlockHeight, ChallengeId};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle status of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    /// Value is locked; the vault may complete or be penalized.
    Active,
    /// The user withdrew after the lock period. Reward claimable once.
    Completed,
    /// Governance enforced the penalty.
    Failed,
}

impl VaultStatus {
    /// Lowercase status name as reported by status queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultStatus::Active => "active",
            VaultStatus::Completed => "completed",
            VaultStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key of a vault record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VaultKey {
    /// Challenge the deposit was made into.
    pub challenge_id: ChallengeId,
    /// Depositing identity.
    pub owner: Principal,
}

impl VaultKey {
    /// Builds a key.
    pub fn new(challenge_id: ChallengeId, owner: Principal) -> Self {
        Self { challenge_id, owner }
    }
}

/// One user's deposit into one challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Deposited amount. Fixed at admission.
    pub locked_amount: Amount,
    /// Height at which the deposit was admitted.
    pub deposit_time: BlockHeight,
    /// Current lifecycle status.
    pub status: VaultStatus,
    /// Set together with `status = Failed`.
    pub penalty_enforced: bool,
    /// Set once the reward has been paid.
    pub reward_claimed: bool,
    /// Lock duration copied from the challenge at deposit time, so later
    /// reconfiguration does not move existing unlock heights.
    pub lock_period: u64,
}

impl VaultRecord {
    /// First height at which the vault may complete, or `None` when that
    /// height lies beyond the range of the clock.
    pub fn unlocks_at(&self) -> Option<BlockHeight> {
        self.deposit_time.checked_add(self.lock_period)
    }

    /// Whether the lock period has elapsed at `now`.
    pub fn is_unlocked_at(&self, now: BlockHeight) -> bool {
        self.unlocks_at().is_some_and(|h| now >= h)
    }
}

/// Identity of the caller and the current height, supplied by the harness
/// for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Identity invoking the operation.
    pub caller: Principal,
    /// Current contract clock.
    pub now: BlockHeight,
}

impl CallContext {
    /// Builds a context.
    pub fn new(caller: impl Into<Principal>, now: BlockHeight) -> Self {
        Self {
            caller: caller.into(),
            now,
        }
    }
}

/// Initialization parameters for a [`SavingsVault`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Initial authority identity.
    pub authority: Principal,
    /// Governance identity.
    pub governance: Principal,
    /// Account reward tokens are paid from.
    pub reward_source: Principal,
    /// Cap on admitted deposits per user across all challenges.
    #[serde(default = "default_max_deposits_per_user")]
    pub max_deposits_per_user: u32,
}

fn default_max_deposits_per_user() -> u32 {
    DEFAULT_MAX_DEPOSITS_PER_USER
}

impl VaultSettings {
    /// Settings with the default per-user deposit cap.
    pub fn new(
        authority: impl Into<Principal>,
        governance: impl Into<Principal>,
        reward_source: impl Into<Principal>,
    ) -> Self {
        Self {
            authority: authority.into(),
            governance: governance.into(),
            reward_source: reward_source.into(),
            max_deposits_per_user: DEFAULT_MAX_DEPOSITS_PER_USER,
        }
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The complete contract state: roles, challenge registry, vault records,
/// per-user deposit counters and the transfer ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsVault {
    pub(crate) admin: AdminState,
    pub(crate) registry: ConfigRegistry,
    pub(crate) vaults: BTreeMap<VaultKey, VaultRecord>,
    pub(crate) deposit_counts: BTreeMap<Principal, u32>,
    pub(crate) max_deposits_per_user: u32,
    pub(crate) transfers: TransferLedger,
}

impl SavingsVault {
    /// Initializes an empty vault with the given role identities.
    pub fn new(settings: VaultSettings) -> Self {
        Self {
            admin: AdminState::new(settings.authority, settings.governance, settings.reward_source),
            registry: ConfigRegistry::new(),
            vaults: BTreeMap::new(),
            deposit_counts: BTreeMap::new(),
            max_deposits_per_user: settings.max_deposits_per_user,
            transfers: TransferLedger::new(),
        }
    }

    // -- Challenge administration ------------------------------------------

    /// Creates or replaces a challenge config. Authority only.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotAuthorized`] first, then the parameter checks of
    /// [`ChallengeParams::validate`] in order.
    pub fn configure_challenge(
        &mut self,
        ctx: &CallContext,
        challenge_id: ChallengeId,
        params: ChallengeParams,
    ) -> Result<(), VaultError> {
        self.admin.require_role(&ctx.caller, Role::Authority)?;
        self.registry.configure(challenge_id, params, ctx.now)
    }

    /// Stops admitting deposits into a challenge. Authority only.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotAuthorized`], then [`VaultError::ChallengeNotFound`].
    pub fn deactivate_challenge(
        &mut self,
        ctx: &CallContext,
        challenge_id: ChallengeId,
    ) -> Result<(), VaultError> {
        self.admin.require_role(&ctx.caller, Role::Authority)?;
        self.registry.deactivate(challenge_id)
    }

    /// Hands the authority role to `new_authority`. Authority only.
    pub fn set_authority_contract(
        &mut self,
        ctx: &CallContext,
        new_authority: Principal,
    ) -> Result<(), VaultError> {
        self.admin.set_authority(&ctx.caller, new_authority)
    }

    // -- Admission -----------------------------------------------------------

    /// Locks `amount` from the caller into a new vault for `challenge_id`.
    ///
    /// Records a locked-asset transfer from the caller to custody.
    ///
    /// # Errors
    ///
    /// In order: [`VaultError::ChallengeNotFound`],
    /// [`VaultError::ChallengeNotStarted`] (inactive or outside the window),
    /// [`VaultError::UserAlreadyDeposited`], [`VaultError::InvalidAmount`],
    /// [`VaultError::InvalidMinDeposit`], [`VaultError::InvalidMaxDeposit`],
    /// [`VaultError::MaxDepositsExceeded`].
    pub fn deposit_funds(
        &mut self,
        ctx: &CallContext,
        challenge_id: ChallengeId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let config = self.registry.require(challenge_id)?;
        if !config.accepts_deposits_at(ctx.now) {
            return Err(VaultError::ChallengeNotStarted(challenge_id));
        }

        let key = VaultKey::new(challenge_id, ctx.caller.clone());
        if self.vaults.contains_key(&key) {
            return Err(VaultError::UserAlreadyDeposited(challenge_id));
        }

        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if amount < config.params.min_deposit {
            return Err(VaultError::InvalidMinDeposit);
        }
        if amount > config.params.max_deposit {
            return Err(VaultError::InvalidMaxDeposit);
        }

        let count = self.deposit_counts.get(&ctx.caller).copied().unwrap_or(0);
        if count >= self.max_deposits_per_user {
            return Err(VaultError::MaxDepositsExceeded {
                limit: self.max_deposits_per_user,
            });
        }

        let lock_period = config.params.lock_duration;

        self.transfers.record(Transfer {
            asset: Asset::Locked,
            amount,
            from: Party::Account(ctx.caller.clone()),
            to: Party::Custody,
            challenge_id,
            height: ctx.now,
        });
        self.vaults.insert(
            key,
            VaultRecord {
                locked_amount: amount,
                deposit_time: ctx.now,
                status: VaultStatus::Active,
                penalty_enforced: false,
                reward_claimed: false,
                lock_period,
            },
        );
        self.deposit_counts.insert(ctx.caller.clone(), count + 1);

        tracing::debug!(
            challenge_id,
            user = %ctx.caller,
            amount,
            unlocks_at = ?ctx.now.checked_add(lock_period),
            "deposit admitted"
        );
        Ok(())
    }

    // -- Completion ----------------------------------------------------------

    /// Returns the caller's principal after the lock period and marks the
    /// vault completed.
    ///
    /// The returned reward is only computed here; it is paid out by a
    /// separate [`claim_reward`](Self::claim_reward) call.
    ///
    /// # Errors
    ///
    /// In order: [`VaultError::ChallengeNotFound`] (no vault, then no
    /// config), [`VaultError::InvalidStatus`] (not active),
    /// [`VaultError::LockPeriodNotEnded`], [`VaultError::RewardNotAvailable`]
    /// (reward rounds to zero).
    pub fn withdraw_on_completion(
        &mut self,
        ctx: &CallContext,
        challenge_id: ChallengeId,
    ) -> Result<Amount, VaultError> {
        let key = VaultKey::new(challenge_id, ctx.caller.clone());
        let record = self
            .vaults
            .get_mut(&key)
            .ok_or(VaultError::ChallengeNotFound(challenge_id))?;
        let config = self.registry.require(challenge_id)?;

        if record.status != VaultStatus::Active {
            return Err(VaultError::InvalidStatus);
        }
        if !record.is_unlocked_at(ctx.now) {
            return Err(VaultError::LockPeriodNotEnded {
                unlocks_at: record.unlocks_at().unwrap_or(BlockHeight::MAX),
                now: ctx.now,
            });
        }
        let reward = config.reward_for(record.locked_amount)?;
        if reward == 0 {
            return Err(VaultError::RewardNotAvailable);
        }

        self.transfers.record(Transfer {
            asset: Asset::Locked,
            amount: record.locked_amount,
            from: Party::Custody,
            to: Party::Account(ctx.caller.clone()),
            challenge_id,
            height: ctx.now,
        });
        record.status = VaultStatus::Completed;
        record.reward_claimed = false;

        tracing::debug!(challenge_id, user = %ctx.caller, reward, "vault completed");
        Ok(reward)
    }

    /// Pays the reward of a completed vault to its owner. At most once.
    ///
    /// Records a reward-asset transfer from the reward source to the caller.
    ///
    /// # Errors
    ///
    /// In order: [`VaultError::ChallengeNotFound`] (no vault, then no
    /// config), [`VaultError::InvalidStatus`] (not completed),
    /// [`VaultError::RewardNotAvailable`] (already claimed).
    pub fn claim_reward(
        &mut self,
        ctx: &CallContext,
        challenge_id: ChallengeId,
    ) -> Result<Amount, VaultError> {
        let key = VaultKey::new(challenge_id, ctx.caller.clone());
        let record = self
            .vaults
            .get_mut(&key)
            .ok_or(VaultError::ChallengeNotFound(challenge_id))?;
        let config = self.registry.require(challenge_id)?;

        if record.status != VaultStatus::Completed {
            return Err(VaultError::InvalidStatus);
        }
        if record.reward_claimed {
            return Err(VaultError::RewardNotAvailable);
        }
        let reward = config.reward_for(record.locked_amount)?;

        self.transfers.record(Transfer {
            asset: Asset::Reward,
            amount: reward,
            from: Party::Account(self.admin.reward_source().clone()),
            to: Party::Account(ctx.caller.clone()),
            challenge_id,
            height: ctx.now,
        });
        record.reward_claimed = true;

        tracing::debug!(challenge_id, user = %ctx.caller, reward, "reward claimed");
        Ok(reward)
    }

    // -- Penalty -------------------------------------------------------------

    /// Fails `user`'s vault: the penalty share goes to governance, the rest
    /// back to the user. Governance only.
    ///
    /// # Errors
    ///
    /// In order: [`VaultError::NotAuthorized`],
    /// [`VaultError::ChallengeNotFound`] (no vault, then no config),
    /// [`VaultError::InvalidStatus`] (not active),
    /// [`VaultError::PenaltyAlreadyEnforced`].
    pub fn enforce_penalty(
        &mut self,
        ctx: &CallContext,
        challenge_id: ChallengeId,
        user: &Principal,
    ) -> Result<Amount, VaultError> {
        self.admin.require_role(&ctx.caller, Role::Governance)?;

        let key = VaultKey::new(challenge_id, user.clone());
        let record = self
            .vaults
            .get_mut(&key)
            .ok_or(VaultError::ChallengeNotFound(challenge_id))?;
        let config = self.registry.require(challenge_id)?;

        if record.status != VaultStatus::Active {
            return Err(VaultError::InvalidStatus);
        }
        if record.penalty_enforced {
            return Err(VaultError::PenaltyAlreadyEnforced);
        }

        let penalty = config.penalty_for(record.locked_amount)?;
        // penalty_rate <= 100, so this never underflows.
        let remaining = record.locked_amount.saturating_sub(penalty);

        self.transfers.record(Transfer {
            asset: Asset::Locked,
            amount: penalty,
            from: Party::Custody,
            to: Party::Account(self.admin.holder(Role::Governance).clone()),
            challenge_id,
            height: ctx.now,
        });
        self.transfers.record(Transfer {
            asset: Asset::Locked,
            amount: remaining,
            from: Party::Custody,
            to: Party::Account(user.clone()),
            challenge_id,
            height: ctx.now,
        });
        record.status = VaultStatus::Failed;
        record.penalty_enforced = true;

        tracing::info!(challenge_id, user = %user, penalty, remaining, "penalty enforced");
        Ok(penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH: &str = "ST1AUTH";
    const GOV: &str = "ST1GOV";
    const ALICE: &str = "ST1ALICE";

    fn params() -> ChallengeParams {
        ChallengeParams {
            min_deposit: 100,
            max_deposit: 1000,
            penalty_rate: 10,
            reward_rate: 20,
            lock_duration: 30,
            start_time: 0,
            end_time: 100,
        }
    }

    fn vault_with_challenge() -> SavingsVault {
        let mut vault = SavingsVault::new(VaultSettings::new(AUTH, GOV, "ST1TREASURY"));
        vault
            .configure_challenge(&CallContext::new(AUTH, 0), 1, params())
            .unwrap();
        vault
    }

    #[test]
    fn deposit_creates_active_record() {
        let mut vault = vault_with_challenge();
        vault.deposit_funds(&CallContext::new(ALICE, 5), 1, 500).unwrap();

        let record = &vault.vaults[&VaultKey::new(1, ALICE.into())];
        assert_eq!(record.locked_amount, 500);
        assert_eq!(record.deposit_time, 5);
        assert_eq!(record.status, VaultStatus::Active);
        assert_eq!(record.lock_period, 30);
        assert_eq!(record.unlocks_at(), Some(35));
        assert_eq!(vault.deposit_counts[&Principal::from(ALICE)], 1);
    }

    #[test]
    fn rejected_deposit_leaves_state_untouched() {
        let mut vault = vault_with_challenge();
        let before = vault.clone();
        let result = vault.deposit_funds(&CallContext::new(ALICE, 0), 1, 50);
        assert_eq!(result, Err(VaultError::InvalidMinDeposit));
        assert_eq!(vault, before);
    }

    #[test]
    fn deposit_window_checked_before_duplicate() {
        let mut vault = vault_with_challenge();
        vault.deposit_funds(&CallContext::new(ALICE, 0), 1, 500).unwrap();
        let result = vault.deposit_funds(&CallContext::new(ALICE, 101), 1, 500);
        assert_eq!(result, Err(VaultError::ChallengeNotStarted(1)));
    }

    #[test]
    fn duplicate_checked_before_amount() {
        let mut vault = vault_with_challenge();
        vault.deposit_funds(&CallContext::new(ALICE, 0), 1, 500).unwrap();
        let result = vault.deposit_funds(&CallContext::new(ALICE, 0), 1, 0);
        assert_eq!(result, Err(VaultError::UserAlreadyDeposited(1)));
    }

    #[test]
    fn lock_period_frozen_at_deposit() {
        let mut vault = vault_with_challenge();
        vault.deposit_funds(&CallContext::new(ALICE, 0), 1, 500).unwrap();

        let longer = ChallengeParams { lock_duration: 90, ..params() };
        vault
            .configure_challenge(&CallContext::new(AUTH, 0), 1, longer)
            .unwrap();

        let reward = vault
            .withdraw_on_completion(&CallContext::new(ALICE, 30), 1)
            .unwrap();
        assert_eq!(reward, 100);
    }

    #[test]
    fn withdraw_reports_unlock_height() {
        let mut vault = vault_with_challenge();
        vault.deposit_funds(&CallContext::new(ALICE, 10), 1, 500).unwrap();
        let result = vault.withdraw_on_completion(&CallContext::new(ALICE, 39), 1);
        assert_eq!(
            result,
            Err(VaultError::LockPeriodNotEnded { unlocks_at: 40, now: 39 })
        );
    }

    #[test]
    fn unlock_height_past_clock_range_never_unlocks() {
        let mut vault = vault_with_challenge();
        let forever = ChallengeParams { lock_duration: u64::MAX, ..params() };
        vault
            .configure_challenge(&CallContext::new(AUTH, 0), 2, forever)
            .unwrap();
        vault.deposit_funds(&CallContext::new(ALICE, 1), 2, 500).unwrap();

        let record = &vault.vaults[&VaultKey::new(2, ALICE.into())];
        assert_eq!(record.unlocks_at(), None);
        assert!(!record.is_unlocked_at(u64::MAX));

        let result = vault.withdraw_on_completion(&CallContext::new(ALICE, u64::MAX), 2);
        assert_eq!(
            result,
            Err(VaultError::LockPeriodNotEnded { unlocks_at: u64::MAX, now: u64::MAX })
        );
        assert_eq!(vault.vault_balance(2, &Principal::from(ALICE)), 500);
    }

    #[test]
    fn zero_reward_blocks_withdrawal() {
        let mut vault = vault_with_challenge();
        let stingy = ChallengeParams { reward_rate: 0, ..params() };
        vault
            .configure_challenge(&CallContext::new(AUTH, 0), 2, stingy)
            .unwrap();
        vault.deposit_funds(&CallContext::new(ALICE, 0), 2, 500).unwrap();

        let result = vault.withdraw_on_completion(&CallContext::new(ALICE, 30), 2);
        assert_eq!(result, Err(VaultError::RewardNotAvailable));
        assert_eq!(
            vault.vaults[&VaultKey::new(2, ALICE.into())].status,
            VaultStatus::Active
        );
    }

    #[test]
    fn penalty_uses_current_governance_for_payout() {
        let mut vault = vault_with_challenge();
        vault.deposit_funds(&CallContext::new(ALICE, 0), 1, 999).unwrap();
        let penalty = vault
            .enforce_penalty(&CallContext::new(GOV, 1), 1, &ALICE.into())
            .unwrap();
        assert_eq!(penalty, 99);

        let payouts = &vault.transfers.entries()[1..];
        assert_eq!(payouts[0].to, Party::Account(GOV.into()));
        assert_eq!(payouts[0].amount, 99);
        assert_eq!(payouts[1].to, Party::Account(ALICE.into()));
        assert_eq!(payouts[1].amount, 900);
    }

    #[test]
    fn deposit_cap_counts_across_challenges() {
        let mut settings = VaultSettings::new(AUTH, GOV, "ST1TREASURY");
        settings.max_deposits_per_user = 2;
        let mut vault = SavingsVault::new(settings);
        let auth = CallContext::new(AUTH, 0);
        for id in 1..=3 {
            vault.configure_challenge(&auth, id, params()).unwrap();
        }

        let alice = CallContext::new(ALICE, 0);
        vault.deposit_funds(&alice, 1, 100).unwrap();
        vault.deposit_funds(&alice, 2, 100).unwrap();
        assert_eq!(
            vault.deposit_funds(&alice, 3, 100),
            Err(VaultError::MaxDepositsExceeded { limit: 2 })
        );

        // The cap is per user.
        vault.deposit_funds(&CallContext::new("ST1BOB", 0), 3, 100).unwrap();
    }
}
