//! Property tests for settlement arithmetic and the vault lifecycle.

use pledge_contracts::{
    Asset, CallContext, ChallengeParams, Principal, SavingsVault, VaultError, VaultSettings,
    VaultStatus,
};
use proptest::prelude::*;

fn vault_with(min: u64, max: u64, penalty_rate: u32, reward_rate: u32, lock: u64) -> SavingsVault {
    let mut vault = SavingsVault::new(VaultSettings::new("auth", "gov", "treasury"));
    let params = ChallengeParams {
        min_deposit: min,
        max_deposit: max,
        penalty_rate,
        reward_rate,
        lock_duration: lock,
        start_time: 0,
        end_time: 1_000,
    };
    vault
        .configure_challenge(&CallContext::new("auth", 0), 1, params)
        .unwrap();
    vault
}

proptest! {
    #[test]
    fn penalty_and_remainder_sum_to_locked(amount in 1u64..=u64::MAX / 2, rate in 0u32..=100) {
        let mut vault = vault_with(1, u64::MAX, rate, 20, 10);
        let user = Principal::from("user");
        vault.deposit_funds(&CallContext::new("user", 0), 1, amount).unwrap();

        let penalty = vault.enforce_penalty(&CallContext::new("gov", 0), 1, &user).unwrap();
        let payouts = &vault.transfers().entries()[1..];
        prop_assert_eq!(payouts[0].amount, penalty);
        prop_assert_eq!(payouts[0].amount as u128 + payouts[1].amount as u128, amount as u128);
        prop_assert_eq!(penalty as u128, amount as u128 * rate as u128 / 100);
        prop_assert_eq!(vault.locked_in_custody(), 0);
    }

    #[test]
    fn withdraw_succeeds_iff_unlocked(
        deposit_at in 0u64..500,
        lock in 1u64..200,
        now_offset in 0u64..400,
    ) {
        let mut vault = vault_with(1, 10_000, 10, 20, lock);
        vault.deposit_funds(&CallContext::new("user", deposit_at), 1, 5_000).unwrap();
        let now = deposit_at + now_offset;

        let result = vault.withdraw_on_completion(&CallContext::new("user", now), 1);
        if now >= deposit_at + lock {
            prop_assert_eq!(result, Ok(1_000));
            prop_assert_eq!(
                vault.deposit_status(1, &"user".into()),
                Ok(VaultStatus::Completed)
            );
        } else {
            let is_locked = matches!(result, Err(VaultError::LockPeriodNotEnded { .. }));
            prop_assert!(is_locked);
            prop_assert_eq!(vault.transfers().len(), 1);
        }
    }

    #[test]
    fn reward_is_floor_of_rate(amount in 1u64..1_000_000, rate in 1u32..=200) {
        let mut vault = vault_with(1, 1_000_000, 10, rate, 1);
        vault.deposit_funds(&CallContext::new("user", 0), 1, amount).unwrap();

        let expected = amount * rate as u64 / 100;
        let result = vault.withdraw_on_completion(&CallContext::new("user", 1), 1);
        if expected == 0 {
            prop_assert_eq!(result, Err(VaultError::RewardNotAvailable));
        } else {
            prop_assert_eq!(result, Ok(expected));
            prop_assert_eq!(vault.claim_reward(&CallContext::new("user", 1), 1), Ok(expected));
            let paid: u64 = vault.transfers().for_asset(Asset::Reward).map(|t| t.amount).sum();
            prop_assert_eq!(paid, expected);
        }
    }
}

#[test]
fn reward_overflow_is_rejected_without_mutation() {
    let mut vault = vault_with(1, u64::MAX, 10, 200, 1);
    vault
        .deposit_funds(&CallContext::new("user", 0), 1, u64::MAX)
        .unwrap();
    let before = vault.clone();

    let result = vault.withdraw_on_completion(&CallContext::new("user", 1), 1);
    assert_eq!(
        result,
        Err(VaultError::AmountOverflow { amount: u64::MAX, rate: 200 })
    );
    assert_eq!(vault, before);
}
