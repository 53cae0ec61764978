//! # Node Configuration
//!
//! `config.toml` has two sections:
//!
//! ```toml
//! [vault]
//! authority = "ST1AUTHORITY"
//! governance = "ST1GOVERNANCE"
//! reward_source = "ST1REWARDS"
//! max_deposits_per_user = 1000
//!
//! [node]
//! block_time_ms = 2000
//! rpc_port = 9741
//! metrics_port = 9742
//! ```
//!
//! `[vault]` is required. `[node]` and every key in it fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use pledge_contracts::VaultSettings;

/// Default interval between block clock ticks.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 2_000;

/// Default port for the JSON-RPC/REST API.
pub const DEFAULT_RPC_PORT: u16 = 9741;

/// Default port for the Prometheus endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9742;

/// Parsed `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Role identities and limits handed to the vault at initialization.
    pub vault: VaultSettings,
    /// Host settings.
    #[serde(default)]
    pub node: HostSettings,
}

/// Host-side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Milliseconds between block height increments.
    pub block_time_ms: u64,
    /// API port.
    pub rpc_port: u16,
    /// Metrics port.
    pub metrics_port: u16,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            block_time_ms: DEFAULT_BLOCK_TIME_MS,
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl NodeConfig {
    /// Devnet defaults: fixed, well-known role identities.
    pub fn devnet() -> Self {
        Self {
            vault: VaultSettings::new("ST1AUTHORITY", "ST1GOVERNANCE", "ST1REWARDS"),
            node: HostSettings::default(),
        }
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: NodeConfig = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        if config.node.block_time_ms == 0 {
            anyhow::bail!("block_time_ms must be positive in {}", path.display());
        }
        Ok(config)
    }

    /// Serializes to TOML, as written by `pledge-node init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_config_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[vault]\nauthority = \"A\"\ngovernance = \"G\"\nreward_source = \"R\"\n"
        )
        .unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.vault.authority.as_str(), "A");
        assert_eq!(config.vault.max_deposits_per_user, 1_000);
        assert_eq!(config.node, HostSettings::default());
    }

    #[test]
    fn devnet_config_roundtrips_through_toml() {
        let config = NodeConfig::devnet();
        let text = config.to_toml().unwrap();
        let parsed: NodeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn zero_block_time_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[vault]\nauthority = \"A\"\ngovernance = \"G\"\nreward_source = \"R\"\n\n[node]\nblock_time_ms = 0\n"
        )
        .unwrap();
        assert!(NodeConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_vault_section_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[node]\nrpc_port = 1\n").unwrap();
        assert!(NodeConfig::load(file.path()).is_err());
    }
}
