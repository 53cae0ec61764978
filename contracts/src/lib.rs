// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Pledge Savings Vault
//!
//! A time-locked commitment vault. A user locks value against a configured
//! *challenge* (deposit bounds, a lock duration, and reward/penalty rates).
//! Once the lock period has elapsed the user withdraws the principal and
//! claims a proportional reward; if the challenge is failed, the governance
//! role enforces a penalty that splits the locked value between governance
//! and the user.
//!
//! The contract never moves value itself. Every value movement is recorded
//! as a [`transfer::Transfer`] intent and handed to an external
//! [`transfer::TransferExecutor`].
//!
//! ## Modules
//!
//! - [`access`] — role identities (authority, governance, reward source).
//! - [`registry`] — per-challenge configuration, authority-gated.
//! - [`vault`] — the deposit state machine: admission, completion, claim,
//!   penalty.
//! - [`transfer`] — append-only ledger of transfer intents.
//! - [`query`] — read-only balance and status projections.
//!
//! ## Design Principles
//!
//! 1. Every operation validates fully before it mutates anything. A failed
//!    call leaves the vault byte-for-byte unchanged.
//! 2. Validation order is part of the contract: when several checks fail at
//!    once, the first one in documented order is reported.
//! 3. Rate arithmetic is checked. Amounts never wrap.
//! 4. All state is serializable (serde) so the harness can snapshot it.

pub mod access;
pub mod config;
pub mod error;
pub mod query;
pub mod registry;
pub mod transfer;
pub mod vault;

pub use access::{AdminState, Principal, Role};
pub use error::VaultError;
pub use registry::{ChallengeConfig, ChallengeParams, ConfigRegistry};
pub use transfer::{Asset, Party, Transfer, TransferExecutor, TransferLedger};
pub use vault::{CallContext, SavingsVault, VaultKey, VaultRecord, VaultSettings, VaultStatus};

/// Positive identifier of a configured challenge.
pub type ChallengeId = u64;

/// Quantity of either asset, in its smallest unit.
pub type Amount = u64;

/// Externally supplied monotonic tick counter used as the contract clock.
pub type BlockHeight = u64;
