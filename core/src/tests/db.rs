use std::sync::Arc;

use murk_account::{AccountId, AccountState};
use murk_keypair::Keypair;
use murk_privacy::{Commitment, Denomination, Nullifier};
use tempfile::TempDir;

use super::{Harness, ONE};
use crate::error::PoolError;
use crate::pool::state::{CommitmentRecord, NullifierRecord, PoolAggregate};
use crate::storage::{CF_NULLIFIERS, DuplicateKey, LedgerBatch, LedgerStore, RocksDbStore};

fn temp_db() -> (TempDir, RocksDbStore) {
    let dir = TempDir::new().unwrap();
    let db = RocksDbStore::open(dir.path()).unwrap();
    (dir, db)
}

#[test]
fn missing_account_has_zero_balance() {
    let (_dir, db) = temp_db();
    assert_eq!(db.account(&AccountId([9; 32])).unwrap().balance, 0);
    assert!(db.pool().unwrap().is_none());
    assert!(db.churn_vault(0).unwrap().is_none());
}

#[test]
fn empty_batch_is_a_no_op() {
    let (_dir, db) = temp_db();
    let batch = LedgerBatch::default();
    assert!(batch.is_empty());
    db.apply(batch).unwrap();
    assert!(db.pool().unwrap().is_none());

    let mut batch = LedgerBatch::default();
    batch.put_account(AccountId([1; 32]), AccountState { balance: 1 });
    assert!(!batch.is_empty());
}

#[test]
fn batch_writes_all_tables() {
    let (_dir, db) = temp_db();
    let id = AccountId([1; 32]);
    let commitment = Commitment([2; 32]);
    let nullifier = Nullifier([3; 32]);

    let mut batch = LedgerBatch::default();
    batch.put_account(id, AccountState { balance: 5 });
    batch.put_account(id, AccountState { balance: 7 });
    batch.pool = Some(PoolAggregate {
        sequence: 4,
        ..PoolAggregate::default()
    });
    batch.commitment_inserts.push(CommitmentRecord {
        commitment,
        amount: ONE,
        timestamp: 10,
        spent: false,
    });
    batch.nullifier_inserts.push(NullifierRecord {
        nullifier,
        used_at: 11,
    });
    db.apply(batch).unwrap();

    assert_eq!(db.account(&id).unwrap().balance, 7);
    assert_eq!(db.pool().unwrap().unwrap().sequence, 4);
    assert_eq!(db.commitment(&commitment).unwrap().unwrap().amount, ONE);
    assert_eq!(db.nullifier(&nullifier).unwrap().unwrap().used_at, 11);
}

#[test]
fn duplicate_insert_writes_nothing() {
    let (_dir, db) = temp_db();
    let nullifier = Nullifier([3; 32]);
    let record = NullifierRecord {
        nullifier,
        used_at: 1,
    };

    let mut first = LedgerBatch::default();
    first.nullifier_inserts.push(record);
    db.apply(first).unwrap();

    let mut second = LedgerBatch::default();
    second.put_account(AccountId([1; 32]), AccountState { balance: 99 });
    second.nullifier_inserts.push(record);
    let err = db.apply(second).unwrap_err();

    assert_eq!(
        err.downcast_ref::<DuplicateKey>(),
        Some(&DuplicateKey {
            table: CF_NULLIFIERS,
            key: [3; 32],
        })
    );
    assert_eq!(db.account(&AccountId([1; 32])).unwrap().balance, 0);
}

#[test]
fn pool_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (note, recipient) = {
        let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
        let mut h = Harness::with_store(store);
        let note = h.deposit_note(Denomination::OneSol);
        let recipient = Keypair::new_random().account_id();
        h.pool
            .withdraw(note.secret_hash, note.nullifier, ONE, recipient)
            .unwrap();
        (note, recipient)
    };

    let store: Arc<dyn LedgerStore> = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    assert_eq!(store.account(&recipient).unwrap().balance, ONE);
    assert!(store.nullifier(&note.nullifier).unwrap().is_some());
    assert!(store.commitment(&note.commitment).unwrap().unwrap().spent);
    let pool = store.pool().unwrap().unwrap();
    assert_eq!(pool.deposit_count, 1);
    assert_eq!(pool.withdraw_count, 1);

    // the spent nullifier stays spent after restart
    let clock = Arc::new(crate::clock::ManualClock::new(0));
    let mut reopened = crate::pool::PrivacyPool::new(store, clock);
    let err = reopened
        .withdraw(
            note.secret_hash,
            note.nullifier,
            ONE,
            Keypair::new_random().account_id(),
        )
        .unwrap_err();
    assert!(matches!(err, PoolError::CommitmentSpent));
}

#[test]
fn engine_maps_duplicate_nullifier_to_conflict() {
    // Spent flag out of sync with the nullifier table: the nullifier
    // record alone refuses the spend.
    let (_dir, db) = temp_db();
    let store = Arc::new(db);
    let mut h = Harness::with_store(store.clone());
    let note = h.deposit_note(Denomination::OneSol);
    h.seed_vault(Denomination::OneSol, 1);

    let mut batch = LedgerBatch::default();
    batch.nullifier_inserts.push(NullifierRecord {
        nullifier: note.nullifier,
        used_at: 0,
    });
    store.apply(batch).unwrap();

    let err = h
        .pool
        .withdraw(
            note.secret_hash,
            note.nullifier,
            ONE,
            Keypair::new_random().account_id(),
        )
        .unwrap_err();
    assert!(matches!(err, PoolError::NullifierUsed));
    assert_eq!(h.vault(), 2 * ONE);
}
