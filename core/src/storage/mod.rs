//! Ledger persistence.
//!
//! The pool engine reads through [`LedgerStore`] and writes exclusively by
//! handing a complete [`LedgerBatch`] to [`LedgerStore::apply`], which commits
//! it atomically or not at all.

pub mod db;
pub mod memory;

pub use db::RocksDbStore;
pub use memory::MemoryStore;

use anyhow::Result;
use murk_account::{AccountId, AccountState};
use murk_privacy::{Commitment, Nullifier};
use thiserror::Error;

use crate::pool::state::{
    ChurnVaultState, CommitmentRecord, NullifierRecord, PendingWithdrawal, PoolAggregate,
};

/// Tables with create-if-absent inserts.
pub const CF_PENDING: &str = "pending";
pub const CF_COMMITMENTS: &str = "commitments";
pub const CF_NULLIFIERS: &str = "nullifiers";

/// Raised by `apply` when an insert targets a key that already exists.
/// Nothing from the batch is written.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate key in {table}")]
pub struct DuplicateKey {
    pub table: &'static str,
    pub key: [u8; 32],
}

/// decoupling the pool from the db
pub trait LedgerStore: Send + Sync {
    /// Non-existent accounts have a zero balance.
    fn account(&self, id: &AccountId) -> Result<AccountState>;

    fn pool(&self) -> Result<Option<PoolAggregate>>;

    fn pending(&self, recipient: &AccountId) -> Result<Option<PendingWithdrawal>>;

    fn commitment(&self, commitment: &Commitment) -> Result<Option<CommitmentRecord>>;

    fn nullifier(&self, nullifier: &Nullifier) -> Result<Option<NullifierRecord>>;

    fn churn_vault(&self, index: u8) -> Result<Option<ChurnVaultState>>;

    /// Atomically commits `batch`. Inserts are create-if-absent: an existing
    /// key fails the whole batch with [`DuplicateKey`]. An empty batch writes
    /// nothing.
    fn apply(&self, batch: LedgerBatch) -> Result<()>;
}

/// Batch of ledger writes for atomic commit
#[derive(Debug, Default)]
pub struct LedgerBatch {
    pub accounts: Vec<(AccountId, AccountState)>,
    pub pool: Option<PoolAggregate>,
    pub churn_vaults: Vec<ChurnVaultState>,
    pub pending_inserts: Vec<PendingWithdrawal>,
    pub pending_updates: Vec<PendingWithdrawal>,
    pub commitment_inserts: Vec<CommitmentRecord>,
    pub commitment_updates: Vec<CommitmentRecord>,
    pub nullifier_inserts: Vec<NullifierRecord>,
}

impl LedgerBatch {
    /// Sets the final state of `id`, replacing any earlier entry for it.
    pub fn put_account(&mut self, id: AccountId, state: AccountState) {
        if let Some(slot) = self.accounts.iter_mut().find(|(k, _)| *k == id) {
            slot.1 = state;
        } else {
            self.accounts.push((id, state));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.pool.is_none()
            && self.churn_vaults.is_empty()
            && self.pending_inserts.is_empty()
            && self.pending_updates.is_empty()
            && self.commitment_inserts.is_empty()
            && self.commitment_updates.is_empty()
            && self.nullifier_inserts.is_empty()
    }
}
