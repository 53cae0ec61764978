//! # Vault Host
//!
//! Owns the single [`SavingsVault`] instance and the block clock. All
//! mutating calls go through one mutex, so requests are applied strictly one
//! at a time and each sees a consistent height.
//!
//! After every call the host drains newly recorded transfer intents into a
//! [`TransferExecutor`]. The bundled [`LogExecutor`] only logs them; real
//! settlement rails plug in at the same seam.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use pledge_contracts::{
    Amount, Role, SavingsVault, Transfer, TransferExecutor, VaultError, VaultSettings,
};

use crate::calls::{CallOutput, VaultCall};

/// File name of the vault snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "vault.bin";

/// Executor that records each intent in the log and nothing else.
#[derive(Debug, Default)]
pub struct LogExecutor {
    executed: u64,
}

impl TransferExecutor for LogExecutor {
    fn execute(&mut self, transfer: &Transfer) {
        self.executed += 1;
        tracing::info!(
            asset = %transfer.asset,
            amount = transfer.amount,
            from = %transfer.from,
            to = %transfer.to,
            challenge_id = transfer.challenge_id,
            height = transfer.height,
            "transfer intent"
        );
    }
}

/// Aggregate numbers for `/status` and the metrics gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    /// Current block height.
    pub block_height: u64,
    /// Configured challenges.
    pub challenges: usize,
    /// Vaults still active.
    pub open_vaults: usize,
    /// Locked value held in custody.
    pub locked_in_custody: Amount,
    /// Transfer intents recorded so far.
    pub transfers: usize,
}

/// On-disk snapshot: the full vault plus the clock.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    block_height: u64,
    vault: SavingsVault,
}

/// The vault plus its clock.
pub struct VaultHost {
    vault: Mutex<SavingsVault>,
    executor: Mutex<LogExecutor>,
    block_height: AtomicU64,
}

impl VaultHost {
    /// Hosts `vault` starting at `block_height`.
    pub fn new(vault: SavingsVault, block_height: u64) -> Self {
        Self {
            vault: Mutex::new(vault),
            executor: Mutex::new(LogExecutor::default()),
            block_height: AtomicU64::new(block_height),
        }
    }

    /// Current block height.
    pub fn block_height(&self) -> u64 {
        self.block_height.load(Ordering::SeqCst)
    }

    /// Advances the clock by one block and returns the new height.
    pub fn tick(&self) -> u64 {
        self.block_height.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Moves the clock forward to `height`.
    ///
    /// The clock is monotonic: moving backwards is an error.
    pub fn advance_to(&self, height: u64) -> Result<()> {
        let previous = self.block_height.fetch_max(height, Ordering::SeqCst);
        if height < previous {
            anyhow::bail!("clock cannot move backwards: at {previous}, requested {height}");
        }
        Ok(())
    }

    /// Role identities and limits currently in force.
    pub fn settings(&self) -> VaultSettings {
        let vault = self.vault.lock();
        let admin = vault.admin();
        VaultSettings {
            authority: admin.holder(Role::Authority).clone(),
            governance: admin.holder(Role::Governance).clone(),
            reward_source: admin.reward_source().clone(),
            max_deposits_per_user: vault.max_deposits_per_user(),
        }
    }

    /// Applies one call at the current height and dispatches any transfer
    /// intents it recorded.
    pub fn execute(&self, call: VaultCall) -> Result<CallOutput, VaultError> {
        let mut vault = self.vault.lock();
        let now = self.block_height();
        let method = call.method();
        let query = call.is_query();
        let result = call.apply(&mut vault, now);

        match &result {
            Ok(output) if query => {
                tracing::trace!(method, now, ?output, "query answered");
            }
            Ok(output) => {
                let dispatched = vault.transfers_mut().dispatch(&mut *self.executor.lock());
                tracing::debug!(method, now, ?output, dispatched, "call applied");
            }
            Err(err) => {
                tracing::debug!(method, now, code = err.code(), %err, "call rejected");
            }
        }
        result
    }

    /// Runs `f` with shared access to the vault.
    pub fn read<R>(&self, f: impl FnOnce(&SavingsVault) -> R) -> R {
        f(&self.vault.lock())
    }

    /// Totals over the current state.
    pub fn summary(&self) -> HostSummary {
        let vault = self.vault.lock();
        HostSummary {
            block_height: self.block_height(),
            challenges: vault.challenges().count(),
            open_vaults: vault.open_vaults(),
            locked_in_custody: vault.locked_in_custody(),
            transfers: vault.transfers().len(),
        }
    }

    /// Number of transfer intents handed to the executor since startup.
    pub fn executed_transfers(&self) -> u64 {
        self.executor.lock().executed
    }

    /// Writes a bincode snapshot of the vault and clock to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let vault = self.vault.lock();
        let snapshot = Snapshot {
            block_height: self.block_height(),
            vault: vault.clone(),
        };
        drop(vault);
        let bytes = bincode::serialize(&snapshot).context("failed to encode vault snapshot")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), height = snapshot.block_height, "snapshot saved");
        Ok(())
    }

    /// Restores a host from a snapshot written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)
            .with_context(|| format!("corrupt snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), height = snapshot.block_height, "snapshot restored");
        Ok(Self::new(snapshot.vault, snapshot.block_height))
    }
}
