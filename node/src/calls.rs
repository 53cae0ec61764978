//! # Vault Calls
//!
//! A serializable request type covering every vault entry point. The JSON-RPC
//! gateway and the scenario replayer both decode into [`VaultCall`] and run
//! it through [`VaultCall::apply`], so the two surfaces cannot drift apart.
//!
//! Wire shape: `{"method": "depositFunds", "params": {"caller": "...", ...}}`.

use serde::{Deserialize, Serialize};

use pledge_contracts::{
    Amount, CallContext, ChallengeId, ChallengeParams, Principal, SavingsVault, VaultError,
    VaultStatus,
};

/// A single vault request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum VaultCall {
    ConfigureChallenge {
        caller: Principal,
        challenge_id: ChallengeId,
        #[serde(flatten)]
        params: ChallengeParams,
    },
    DeactivateChallenge {
        caller: Principal,
        challenge_id: ChallengeId,
    },
    SetAuthorityContract {
        caller: Principal,
        new_authority: Principal,
    },
    DepositFunds {
        caller: Principal,
        challenge_id: ChallengeId,
        amount: Amount,
    },
    WithdrawOnCompletion {
        caller: Principal,
        challenge_id: ChallengeId,
    },
    ClaimReward {
        caller: Principal,
        challenge_id: ChallengeId,
    },
    EnforcePenalty {
        caller: Principal,
        challenge_id: ChallengeId,
        user: Principal,
    },
    GetVaultBalance {
        challenge_id: ChallengeId,
        user: Principal,
    },
    CheckDepositStatus {
        challenge_id: ChallengeId,
        user: Principal,
    },
}

/// Successful call result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallOutput {
    /// No payload; serialized as `null`.
    Unit,
    /// Reward, penalty or balance.
    Amount(Amount),
    /// Deposit status string.
    Status(VaultStatus),
}

impl VaultCall {
    /// Wire names of every call, in declaration order.
    pub const METHODS: [&'static str; 9] = [
        "configureChallenge",
        "deactivateChallenge",
        "setAuthorityContract",
        "depositFunds",
        "withdrawOnCompletion",
        "claimReward",
        "enforcePenalty",
        "getVaultBalance",
        "checkDepositStatus",
    ];

    /// Wire name of this call.
    pub fn method(&self) -> &'static str {
        let index = match self {
            VaultCall::ConfigureChallenge { .. } => 0,
            VaultCall::DeactivateChallenge { .. } => 1,
            VaultCall::SetAuthorityContract { .. } => 2,
            VaultCall::DepositFunds { .. } => 3,
            VaultCall::WithdrawOnCompletion { .. } => 4,
            VaultCall::ClaimReward { .. } => 5,
            VaultCall::EnforcePenalty { .. } => 6,
            VaultCall::GetVaultBalance { .. } => 7,
            VaultCall::CheckDepositStatus { .. } => 8,
        };
        Self::METHODS[index]
    }

    /// Whether the call only reads state.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            VaultCall::GetVaultBalance { .. } | VaultCall::CheckDepositStatus { .. }
        )
    }

    /// Decodes a call from a method name and its params object.
    pub fn from_parts(method: &str, params: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({ "method": method, "params": params }))
    }

    /// Runs the call against `vault` at height `now`.
    pub fn apply(self, vault: &mut SavingsVault, now: u64) -> Result<CallOutput, VaultError> {
        match self {
            VaultCall::ConfigureChallenge {
                caller,
                challenge_id,
                params,
            } => vault
                .configure_challenge(&CallContext::new(caller, now), challenge_id, params)
                .map(|()| CallOutput::Unit),
            VaultCall::DeactivateChallenge { caller, challenge_id } => vault
                .deactivate_challenge(&CallContext::new(caller, now), challenge_id)
                .map(|()| CallOutput::Unit),
            VaultCall::SetAuthorityContract { caller, new_authority } => vault
                .set_authority_contract(&CallContext::new(caller, now), new_authority)
                .map(|()| CallOutput::Unit),
            VaultCall::DepositFunds {
                caller,
                challenge_id,
                amount,
            } => vault
                .deposit_funds(&CallContext::new(caller, now), challenge_id, amount)
                .map(|()| CallOutput::Unit),
            VaultCall::WithdrawOnCompletion { caller, challenge_id } => vault
                .withdraw_on_completion(&CallContext::new(caller, now), challenge_id)
                .map(CallOutput::Amount),
            VaultCall::ClaimReward { caller, challenge_id } => vault
                .claim_reward(&CallContext::new(caller, now), challenge_id)
                .map(CallOutput::Amount),
            VaultCall::EnforcePenalty {
                caller,
                challenge_id,
                user,
            } => vault
                .enforce_penalty(&CallContext::new(caller, now), challenge_id, &user)
                .map(CallOutput::Amount),
            VaultCall::GetVaultBalance { challenge_id, user } => {
                Ok(CallOutput::Amount(vault.vault_balance(challenge_id, &user)))
            }
            VaultCall::CheckDepositStatus { challenge_id, user } => vault
                .deposit_status(challenge_id, &user)
                .map(CallOutput::Status),
        }
    }
}
