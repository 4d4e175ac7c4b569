use murk_keypair::Keypair;
use murk_privacy::Denomination;

use super::{HALF, Harness, ONE, TENTH};
use crate::error::{ErrorKind, PoolError};
use crate::pool::CHURN_VAULT_COUNT;

fn churn_ready() -> Harness {
    let mut h = Harness::new();
    h.seed_vault(Denomination::OneSol, 2);
    for i in 0..CHURN_VAULT_COUNT {
        h.pool.init_churn_vault(h.authority, i).unwrap();
    }
    h
}

#[test]
fn churn_and_unchurn_preserve_liquidity() {
    let mut h = churn_ready();
    let total = h.pool.stats().unwrap().total_liquidity();
    assert_eq!(total, 2 * ONE);

    h.pool.churn(h.authority, 0, HALF).unwrap();
    h.pool.churn(h.authority, 2, TENTH).unwrap();
    h.pool.unchurn(h.authority, 0, TENTH).unwrap();

    let stats = h.pool.stats().unwrap();
    assert_eq!(stats.total_liquidity(), total);
    assert_eq!(stats.churn_balances, [HALF - TENTH, 0, TENTH]);
    assert_eq!(stats.vault_balance, 2 * ONE - HALF);
    // deposits and withdrawals are not affected by internal hops
    assert_eq!(stats.aggregate.total_deposited, 2 * ONE);
    assert_eq!(stats.aggregate.total_withdrawn, 0);
}

#[test]
fn churn_counts_but_unchurn_does_not() {
    let mut h = churn_ready();
    h.pool.churn(h.authority, 1, TENTH).unwrap();
    h.pool.churn(h.authority, 1, TENTH).unwrap();
    h.pool.unchurn(h.authority, 1, TENTH).unwrap();

    let vault = h.pool.churn_vault(1).unwrap().unwrap();
    assert_eq!(vault.churn_count, 2);
    assert_eq!(vault.total_churned, 2 * TENTH);
    assert_eq!(h.pool.stats().unwrap().aggregate.churn_count, 2);
}

#[test]
fn unchurn_limited_to_vault_balance() {
    let mut h = churn_ready();
    h.pool.churn(h.authority, 0, TENTH).unwrap();

    let err = h.pool.unchurn(h.authority, 0, HALF).unwrap_err();
    assert!(matches!(
        err,
        PoolError::InsufficientChurnFunds { index: 0, needed: HALF, available: TENTH }
    ));
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(h.pool.stats().unwrap().churn_balances[0], TENTH);
}

#[test]
fn churn_limited_to_pool_vault() {
    let mut h = churn_ready();
    let err = h.pool.churn(h.authority, 0, 3 * ONE).unwrap_err();
    assert!(matches!(err, PoolError::InsufficientPoolFunds { .. }));
}

#[test]
fn churn_argument_checks() {
    let mut h = churn_ready();
    assert!(matches!(
        h.pool.churn(h.authority, 3, TENTH),
        Err(PoolError::InvalidChurnIndex(3))
    ));
    assert!(matches!(
        h.pool.unchurn(h.authority, 7, TENTH),
        Err(PoolError::InvalidChurnIndex(7))
    ));
    assert!(matches!(
        h.pool.churn(h.authority, 0, 0),
        Err(PoolError::ZeroAmount)
    ));
    assert!(matches!(
        h.pool.init_churn_vault(h.authority, 0),
        Err(PoolError::ChurnVaultExists(0))
    ));

    let intruder = Keypair::new_random().account_id();
    assert!(matches!(
        h.pool.churn(intruder, 0, TENTH),
        Err(PoolError::Unauthorized)
    ));
}

#[test]
fn churn_needs_initialized_vault() {
    let mut h = Harness::new();
    h.seed_vault(Denomination::OneSol, 1);
    assert!(matches!(
        h.pool.churn(h.authority, 1, TENTH),
        Err(PoolError::ChurnVaultMissing(1))
    ));
    assert!(matches!(
        h.pool.unchurn(h.authority, 1, TENTH),
        Err(PoolError::ChurnVaultMissing(1))
    ));
}
