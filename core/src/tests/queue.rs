use murk_keypair::Keypair;
use murk_privacy::Denomination;

use super::{HALF, Harness, ONE, START, TENTH};
use crate::error::{ErrorKind, PoolError};
use crate::pool::{MAX_DELAY_SECONDS, MIN_DELAY_SECONDS, pending_address};

#[test]
fn request_sets_delay_within_window() {
    let mut h = Harness::new();
    h.seed_vault(Denomination::TenthSol, 1);

    for _ in 0..25 {
        let recipient = h.ready_request(TENTH);
        let p = h.pool.pending(&recipient).unwrap().unwrap();
        assert_eq!(p.requested_at, START);
        assert!(p.available_at >= START + MIN_DELAY_SECONDS);
        assert!(p.available_at <= START + MAX_DELAY_SECONDS);
        assert!(!p.claimed);
        assert_eq!(p.address(), pending_address(&recipient));
    }
    // requests move no funds
    assert_eq!(h.vault(), TENTH);
}

#[test]
fn claim_follows_time_lock() {
    let mut h = Harness::new();
    h.seed_vault(Denomination::HalfSol, 1);
    let recipient = h.ready_request(HALF);
    let available_at = h.pool.pending(&recipient).unwrap().unwrap().available_at;

    h.clock.set(available_at - 1);
    let err = h.pool.claim_withdrawal(recipient).unwrap_err();
    assert!(matches!(
        err,
        PoolError::NotReady { available_at: a, now } if a == available_at && now == available_at - 1
    ));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(h.pool.balance(&recipient).unwrap(), 0);

    h.clock.set(available_at);
    h.pool.claim_withdrawal(recipient).unwrap();
    assert_eq!(h.pool.balance(&recipient).unwrap(), HALF);
    assert_eq!(h.vault(), 0);

    let record = h.pool.pending(&recipient).unwrap().unwrap();
    assert!(record.claimed);
    let stats = h.pool.stats().unwrap();
    assert_eq!(stats.aggregate.total_withdrawn, HALF);
    assert_eq!(stats.aggregate.withdraw_count, 1);

    h.clock.advance(1_000);
    assert!(matches!(
        h.pool.claim_withdrawal(recipient),
        Err(PoolError::AlreadyClaimed)
    ));
}

#[test]
fn claim_without_request() {
    let mut h = Harness::new();
    let stranger = Keypair::new_random().account_id();
    assert!(matches!(
        h.pool.claim_withdrawal(stranger),
        Err(PoolError::NoPendingWithdrawal(id)) if id == stranger
    ));
}

#[test]
fn second_request_for_same_recipient_conflicts() {
    let mut h = Harness::new();
    h.seed_vault(Denomination::OneSol, 2);
    let recipient = h.ready_request(ONE);

    let err = h.pool.request_withdrawal(recipient, ONE).unwrap_err();
    assert!(matches!(err, PoolError::PendingExists(id) if id == recipient));

    // still one-shot after the claim
    h.wait_out_delay();
    h.pool.claim_withdrawal(recipient).unwrap();
    assert!(matches!(
        h.pool.request_withdrawal(recipient, ONE),
        Err(PoolError::PendingExists(_))
    ));
}

#[test]
fn request_checks_amount_and_liquidity() {
    let mut h = Harness::new();
    let recipient = Keypair::new_random().account_id();

    assert!(matches!(
        h.pool.request_withdrawal(recipient, 42),
        Err(PoolError::NonStandardAmount(42))
    ));
    assert!(matches!(
        h.pool.request_withdrawal(recipient, ONE),
        Err(PoolError::InsufficientPoolFunds { needed: ONE, available: 0 })
    ));
    assert!(h.pool.pending(&recipient).unwrap().is_none());
}

#[test]
fn claim_fails_when_vault_drained_by_earlier_claims() {
    let mut h = Harness::new();
    h.seed_vault(Denomination::OneSol, 1);
    let first = h.ready_request(ONE);
    let second = h.ready_request(ONE);
    h.wait_out_delay();

    h.pool.claim_withdrawal(first).unwrap();
    let err = h.pool.claim_withdrawal(second).unwrap_err();
    assert!(matches!(err, PoolError::InsufficientPoolFunds { needed: ONE, available: 0 }));
    assert!(err.is_retryable());
    assert!(!h.pool.pending(&second).unwrap().unwrap().claimed);
}

#[test]
fn pool_deposit_rejects_odd_amounts() {
    let mut h = Harness::new();
    let depositor = h.funded(ONE);
    assert!(matches!(
        h.pool.pool_deposit(depositor.account_id(), ONE - 1),
        Err(PoolError::NonStandardAmount(_))
    ));
    h.pool.pool_deposit(depositor.account_id(), ONE).unwrap();
    assert_eq!(h.pool.stats().unwrap().aggregate.deposit_count, 1);
}
