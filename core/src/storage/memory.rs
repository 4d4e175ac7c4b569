use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use murk_account::{AccountId, AccountState};
use murk_privacy::{Commitment, Nullifier};

use super::{CF_COMMITMENTS, CF_NULLIFIERS, CF_PENDING, DuplicateKey, LedgerBatch, LedgerStore};
use crate::pool::state::{
    ChurnVaultState, CommitmentRecord, NullifierRecord, PendingWithdrawal, PoolAggregate,
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, AccountState>,
    pool: Option<PoolAggregate>,
    pending: HashMap<AccountId, PendingWithdrawal>,
    commitments: HashMap<Commitment, CommitmentRecord>,
    nullifiers: HashMap<Nullifier, NullifierRecord>,
    churn: HashMap<u8, ChurnVaultState>,
}

/// In-memory ledger with the same atomicity as [`super::RocksDbStore`].
/// Used by tests and `--ephemeral` nodes.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl LedgerStore for MemoryStore {
    fn account(&self, id: &AccountId) -> Result<AccountState> {
        Ok(self.read()?.accounts.get(id).cloned().unwrap_or_default())
    }

    fn pool(&self) -> Result<Option<PoolAggregate>> {
        Ok(self.read()?.pool)
    }

    fn pending(&self, recipient: &AccountId) -> Result<Option<PendingWithdrawal>> {
        Ok(self.read()?.pending.get(recipient).copied())
    }

    fn commitment(&self, commitment: &Commitment) -> Result<Option<CommitmentRecord>> {
        Ok(self.read()?.commitments.get(commitment).copied())
    }

    fn nullifier(&self, nullifier: &Nullifier) -> Result<Option<NullifierRecord>> {
        Ok(self.read()?.nullifiers.get(nullifier).copied())
    }

    fn churn_vault(&self, index: u8) -> Result<Option<ChurnVaultState>> {
        Ok(self.read()?.churn.get(&index).copied())
    }

    fn apply(&self, ops: LedgerBatch) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut t = self
            .tables
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;

        if let Some(dup) = ops
            .pending_inserts
            .iter()
            .find(|p| t.pending.contains_key(&p.recipient))
        {
            return Err(DuplicateKey {
                table: CF_PENDING,
                key: dup.recipient.0,
            }
            .into());
        }
        if let Some(dup) = ops
            .commitment_inserts
            .iter()
            .find(|c| t.commitments.contains_key(&c.commitment))
        {
            return Err(DuplicateKey {
                table: CF_COMMITMENTS,
                key: dup.commitment.0,
            }
            .into());
        }
        if let Some(dup) = ops
            .nullifier_inserts
            .iter()
            .find(|n| t.nullifiers.contains_key(&n.nullifier))
        {
            return Err(DuplicateKey {
                table: CF_NULLIFIERS,
                key: dup.nullifier.0,
            }
            .into());
        }

        for (id, state) in ops.accounts {
            t.accounts.insert(id, state);
        }
        if let Some(pool) = ops.pool {
            t.pool = Some(pool);
        }
        for vault in ops.churn_vaults {
            t.churn.insert(vault.index, vault);
        }
        for p in ops.pending_inserts.into_iter().chain(ops.pending_updates) {
            t.pending.insert(p.recipient, p);
        }
        for c in ops.commitment_inserts.into_iter().chain(ops.commitment_updates) {
            t.commitments.insert(c.commitment, c);
        }
        for n in ops.nullifier_inserts {
            t.nullifiers.insert(n.nullifier, n);
        }
        Ok(())
    }
}
