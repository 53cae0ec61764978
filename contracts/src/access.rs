//! # Access Control
//!
//! Role identities are plain configuration: the vault compares the caller
//! against the identity currently stored for the role. There is no
//! delegation and no multi-step handoff, so replacing the authority takes
//! effect on the very next call.

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Opaque caller identity (an address or account string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wraps an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A privileged role checked by [`AdminState::require_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Configures and deactivates challenges; may replace itself.
    Authority,
    /// Enforces penalties on failed vaults.
    Governance,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Authority => write!(f, "authority"),
            Role::Governance => write!(f, "governance"),
        }
    }
}

/// Process-wide administrative identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminState {
    /// Current authority identity.
    authority: Principal,
    /// Governance identity. Receives penalties.
    governance: Principal,
    /// Source account of reward-token transfers.
    reward_source: Principal,
}

impl AdminState {
    /// Initializes the role table.
    pub fn new(authority: Principal, governance: Principal, reward_source: Principal) -> Self {
        Self {
            authority,
            governance,
            reward_source,
        }
    }

    /// The identity currently holding `role`.
    pub fn holder(&self, role: Role) -> &Principal {
        match role {
            Role::Authority => &self.authority,
            Role::Governance => &self.governance,
        }
    }

    /// Source account for reward payouts.
    pub fn reward_source(&self) -> &Principal {
        &self.reward_source
    }

    /// Fails with [`VaultError::NotAuthorized`] unless `caller` holds `role`.
    pub fn require_role(&self, caller: &Principal, role: Role) -> Result<(), VaultError> {
        if self.holder(role) == caller {
            Ok(())
        } else {
            Err(VaultError::NotAuthorized)
        }
    }

    /// Replaces the authority identity. The caller must be the current
    /// authority.
    pub fn set_authority(
        &mut self,
        caller: &Principal,
        new_authority: Principal,
    ) -> Result<(), VaultError> {
        self.require_role(caller, Role::Authority)?;
        tracing::info!(old = %self.authority, new = %new_authority, "authority replaced");
        self.authority = new_authority;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminState {
        AdminState::new("auth".into(), "gov".into(), "treasury".into())
    }

    #[test]
    fn role_check_matches_holder() {
        let admin = admin();
        assert!(admin.require_role(&"auth".into(), Role::Authority).is_ok());
        assert!(admin.require_role(&"gov".into(), Role::Governance).is_ok());
        assert_eq!(
            admin.require_role(&"gov".into(), Role::Authority),
            Err(VaultError::NotAuthorized)
        );
    }

    #[test]
    fn authority_handoff_is_immediate() {
        let mut admin = admin();
        admin.set_authority(&"auth".into(), "auth2".into()).unwrap();
        assert_eq!(
            admin.require_role(&"auth".into(), Role::Authority),
            Err(VaultError::NotAuthorized)
        );
        assert!(admin.require_role(&"auth2".into(), Role::Authority).is_ok());
    }

    #[test]
    fn only_authority_can_hand_off() {
        let mut admin = admin();
        let result = admin.set_authority(&"mallory".into(), "mallory".into());
        assert_eq!(result, Err(VaultError::NotAuthorized));
        assert_eq!(admin.holder(Role::Authority).as_str(), "auth");
    }
}
