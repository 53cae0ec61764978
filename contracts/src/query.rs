//! # Status Queries
//!
//! Read-only projections over the vault. None of these require a role and
//! none have side effects.

use crate::access::{AdminState, Principal};
use crate::error::VaultError;
use crate::registry::ChallengeConfig;
use crate::transfer::{Asset, TransferLedger};
use crate::vault::{SavingsVault, VaultKey, VaultRecord, VaultStatus};
use crate::{Amount, ChallengeId};

impl SavingsVault {
    /// Locked amount of `user`'s vault in `challenge_id`, or 0 when there is
    /// no such vault. Settled vaults still report their original amount.
    pub fn vault_balance(&self, challenge_id: ChallengeId, user: &Principal) -> Amount {
        self.vault(challenge_id, user)
            .map(|r| r.locked_amount)
            .unwrap_or(0)
    }

    /// Status of `user`'s vault in `challenge_id`.
    ///
    /// # Errors
    ///
    /// [`VaultError::ChallengeNotFound`] if the user never deposited.
    pub fn deposit_status(
        &self,
        challenge_id: ChallengeId,
        user: &Principal,
    ) -> Result<VaultStatus, VaultError> {
        self.vault(challenge_id, user)
            .map(|r| r.status)
            .ok_or(VaultError::ChallengeNotFound(challenge_id))
    }

    /// Full vault record, if any.
    pub fn vault(&self, challenge_id: ChallengeId, user: &Principal) -> Option<&VaultRecord> {
        self.vaults.get(&VaultKey::new(challenge_id, user.clone()))
    }

    /// Challenge config, if configured.
    pub fn challenge(&self, challenge_id: ChallengeId) -> Option<&ChallengeConfig> {
        self.registry.get(challenge_id)
    }

    /// All configured challenges in id order.
    pub fn challenges(&self) -> impl Iterator<Item = (ChallengeId, &ChallengeConfig)> {
        self.registry.iter()
    }

    /// All vault records in key order.
    pub fn vaults(&self) -> impl Iterator<Item = (&VaultKey, &VaultRecord)> {
        self.vaults.iter()
    }

    /// Number of vaults still in [`VaultStatus::Active`].
    pub fn open_vaults(&self) -> usize {
        self.vaults
            .values()
            .filter(|r| r.status == VaultStatus::Active)
            .count()
    }

    /// Deposits admitted for `user` so far, across all challenges.
    pub fn deposit_count(&self, user: &Principal) -> u32 {
        self.deposit_counts.get(user).copied().unwrap_or(0)
    }

    /// Per-user deposit cap.
    pub fn max_deposits_per_user(&self) -> u32 {
        self.max_deposits_per_user
    }

    /// Current role identities.
    pub fn admin(&self) -> &AdminState {
        &self.admin
    }

    /// Recorded transfer intents.
    pub fn transfers(&self) -> &TransferLedger {
        &self.transfers
    }

    /// Mutable ledger access, for dispatching pending intents to an executor.
    pub fn transfers_mut(&mut self) -> &mut TransferLedger {
        &mut self.transfers
    }

    /// Locked value currently held in custody.
    pub fn locked_in_custody(&self) -> Amount {
        self.transfers.custody_balance(Asset::Locked)
    }
}
