//! # Transfer Ledger
//!
//! Records the value movements a vault transition *intends*. Nothing here
//! moves funds: the ledger is an append-only log that an external
//! [`TransferExecutor`] drains and carries out.
//!
//! Two asset classes are tracked:
//!
//! - [`Asset::Locked`] — the deposited value, moved between users and the
//!   vault's custody account.
//! - [`Asset::Reward`] — reward tokens, paid from the configured reward
//!   source to users who completed a challenge.

use serde::{Deserialize, Serialize};

use crate::access::Principal;
use crate::{Amount, BlockHeight, ChallengeId};

/// Asset class of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// Value locked into vaults.
    Locked,
    /// Reward tokens.
    Reward,
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Locked => write!(f, "locked"),
            Asset::Reward => write!(f, "reward"),
        }
    }
}

/// One side of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    /// The vault's own custody account.
    Custody,
    /// An external identity.
    Account(Principal),
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Custody => write!(f, "custody"),
            Party::Account(p) => write!(f, "{}", p),
        }
    }
}

/// A recorded transfer intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Asset class being moved.
    pub asset: Asset,
    /// Amount in the asset's smallest unit.
    pub amount: Amount,
    /// Sending side.
    pub from: Party,
    /// Receiving side.
    pub to: Party,
    /// Challenge whose vault produced this transfer.
    pub challenge_id: ChallengeId,
    /// Height of the call that recorded it.
    pub height: BlockHeight,
}

/// Carries recorded transfers out against real balances.
///
/// Implementations own their failure handling; the ledger hands each intent
/// over exactly once.
pub trait TransferExecutor {
    /// Executes one transfer intent.
    fn execute(&mut self, transfer: &Transfer);
}

/// Append-only log of transfer intents with a dispatch cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLedger {
    entries: Vec<Transfer>,
    /// Index of the first entry not yet handed to an executor.
    dispatched: usize,
}

impl TransferLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transfer intent.
    pub fn record(&mut self, transfer: Transfer) {
        tracing::debug!(
            asset = %transfer.asset,
            amount = transfer.amount,
            from = %transfer.from,
            to = %transfer.to,
            "transfer recorded"
        );
        self.entries.push(transfer);
    }

    /// All recorded transfers, oldest first.
    pub fn entries(&self) -> &[Transfer] {
        &self.entries
    }

    /// Transfers of one asset class, oldest first.
    pub fn for_asset(&self, asset: Asset) -> impl Iterator<Item = &Transfer> {
        self.entries.iter().filter(move |t| t.asset == asset)
    }

    /// Transfers not yet handed to an executor.
    pub fn pending(&self) -> &[Transfer] {
        &self.entries[self.dispatched..]
    }

    /// Hands every pending transfer to `executor`, in order, and advances the
    /// cursor. Returns the number dispatched.
    pub fn dispatch<E: TransferExecutor + ?Sized>(&mut self, executor: &mut E) -> usize {
        let pending = &self.entries[self.dispatched..];
        for transfer in pending {
            executor.execute(transfer);
        }
        let count = pending.len();
        self.dispatched = self.entries.len();
        count
    }

    /// Net amount of `asset` currently held in custody: everything received
    /// minus everything paid out.
    pub fn custody_balance(&self, asset: Asset) -> Amount {
        let (inbound, outbound) = self.for_asset(asset).fold((0u128, 0u128), |(i, o), t| {
            match (&t.from, &t.to) {
                (_, Party::Custody) => (i + t.amount as u128, o),
                (Party::Custody, _) => (i, o + t.amount as u128),
                _ => (i, o),
            }
        });
        u64::try_from(inbound.saturating_sub(outbound)).unwrap_or(u64::MAX)
    }

    /// Number of recorded transfers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(amount: Amount, from: Party, to: Party) -> Transfer {
        Transfer {
            asset: Asset::Locked,
            amount,
            from,
            to,
            challenge_id: 1,
            height: 0,
        }
    }

    fn alice() -> Party {
        Party::Account("alice".into())
    }

    #[derive(Default)]
    struct Collect(Vec<Transfer>);

    impl TransferExecutor for Collect {
        fn execute(&mut self, transfer: &Transfer) {
            self.0.push(transfer.clone());
        }
    }

    #[test]
    fn custody_balance_nets_flows() {
        let mut ledger = TransferLedger::new();
        ledger.record(locked(500, alice(), Party::Custody));
        ledger.record(locked(300, Party::Account("bob".into()), Party::Custody));
        assert_eq!(ledger.custody_balance(Asset::Locked), 800);

        ledger.record(locked(500, Party::Custody, alice()));
        assert_eq!(ledger.custody_balance(Asset::Locked), 300);
        assert_eq!(ledger.custody_balance(Asset::Reward), 0);
    }

    #[test]
    fn reward_transfers_do_not_touch_custody() {
        let mut ledger = TransferLedger::new();
        ledger.record(Transfer {
            asset: Asset::Reward,
            amount: 100,
            from: Party::Account("treasury".into()),
            to: alice(),
            challenge_id: 1,
            height: 5,
        });
        assert_eq!(ledger.custody_balance(Asset::Reward), 0);
        assert_eq!(ledger.for_asset(Asset::Reward).count(), 1);
        assert_eq!(ledger.for_asset(Asset::Locked).count(), 0);
    }

    #[test]
    fn dispatch_hands_over_each_transfer_once() {
        let mut ledger = TransferLedger::new();
        let mut executor = Collect::default();

        ledger.record(locked(10, alice(), Party::Custody));
        ledger.record(locked(20, alice(), Party::Custody));
        assert_eq!(ledger.pending().len(), 2);
        assert_eq!(ledger.dispatch(&mut executor), 2);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.dispatch(&mut executor), 0);

        ledger.record(locked(30, Party::Custody, alice()));
        assert_eq!(ledger.dispatch(&mut executor), 1);
        let amounts: Vec<Amount> = executor.0.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![10, 20, 30]);
        assert_eq!(ledger.len(), 3);
    }
}
