use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};

use murk_account::{AccountId, AccountState};
use murk_privacy::{Commitment, Nullifier};

use super::{CF_COMMITMENTS, CF_NULLIFIERS, CF_PENDING, DuplicateKey, LedgerBatch, LedgerStore};
use crate::pool::state::{
    ChurnVaultState, CommitmentRecord, NullifierRecord, PendingWithdrawal, PoolAggregate,
};

const CF_ACCOUNTS: &str = "accounts";
const CF_POOL: &str = "pool";
const CF_CHURN: &str = "churn";

const POOL_KEY: &[u8] = b"aggregate";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    /// Serializes the duplicate check and the write in `apply`.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [
            CF_ACCOUNTS,
            CF_POOL,
            CF_PENDING,
            CF_COMMITMENTS,
            CF_NULLIFIERS,
            CF_CHURN,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("{} CF missing", name))
    }

    fn get_raw(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get_cf(self.cf(cf)?, key)?)
    }

    fn exists(&self, cf: &str, key: &[u8]) -> Result<bool> {
        Ok(self.get_raw(cf, key)?.is_some())
    }
}

impl LedgerStore for RocksDbStore {
    fn account(&self, id: &AccountId) -> Result<AccountState> {
        match self.get_raw(CF_ACCOUNTS, id.as_bytes())? {
            Some(bytes) => Ok(wincode::deserialize::<AccountState>(&bytes)?),
            None => Ok(AccountState::default()), // Non-existent accounts have 0 balance
        }
    }

    fn pool(&self) -> Result<Option<PoolAggregate>> {
        match self.get_raw(CF_POOL, POOL_KEY)? {
            Some(bytes) => Ok(Some(wincode::deserialize::<PoolAggregate>(&bytes)?)),
            None => Ok(None),
        }
    }

    fn pending(&self, recipient: &AccountId) -> Result<Option<PendingWithdrawal>> {
        match self.get_raw(CF_PENDING, recipient.as_bytes())? {
            Some(bytes) => Ok(Some(wincode::deserialize::<PendingWithdrawal>(&bytes)?)),
            None => Ok(None),
        }
    }

    fn commitment(&self, commitment: &Commitment) -> Result<Option<CommitmentRecord>> {
        match self.get_raw(CF_COMMITMENTS, commitment.as_bytes())? {
            Some(bytes) => Ok(Some(wincode::deserialize::<CommitmentRecord>(&bytes)?)),
            None => Ok(None),
        }
    }

    fn nullifier(&self, nullifier: &Nullifier) -> Result<Option<NullifierRecord>> {
        match self.get_raw(CF_NULLIFIERS, nullifier.as_bytes())? {
            Some(bytes) => Ok(Some(wincode::deserialize::<NullifierRecord>(&bytes)?)),
            None => Ok(None),
        }
    }

    fn churn_vault(&self, index: u8) -> Result<Option<ChurnVaultState>> {
        match self.get_raw(CF_CHURN, &[index])? {
            Some(bytes) => Ok(Some(wincode::deserialize::<ChurnVaultState>(&bytes)?)),
            None => Ok(None),
        }
    }

    fn apply(&self, ops: LedgerBatch) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("write lock poisoned"))?;

        // Create-if-absent checks
        for p in &ops.pending_inserts {
            if self.exists(CF_PENDING, p.recipient.as_bytes())? {
                return Err(DuplicateKey {
                    table: CF_PENDING,
                    key: p.recipient.0,
                }
                .into());
            }
        }
        for c in &ops.commitment_inserts {
            if self.exists(CF_COMMITMENTS, c.commitment.as_bytes())? {
                return Err(DuplicateKey {
                    table: CF_COMMITMENTS,
                    key: c.commitment.0,
                }
                .into());
            }
        }
        for n in &ops.nullifier_inserts {
            if self.exists(CF_NULLIFIERS, n.nullifier.as_bytes())? {
                return Err(DuplicateKey {
                    table: CF_NULLIFIERS,
                    key: n.nullifier.0,
                }
                .into());
            }
        }

        let cf_accounts = self.cf(CF_ACCOUNTS)?;
        let cf_pool = self.cf(CF_POOL)?;
        let cf_churn = self.cf(CF_CHURN)?;
        let cf_pending = self.cf(CF_PENDING)?;
        let cf_commitments = self.cf(CF_COMMITMENTS)?;
        let cf_nullifiers = self.cf(CF_NULLIFIERS)?;

        let mut batch = WriteBatch::default();

        for (id, state) in &ops.accounts {
            batch.put_cf(cf_accounts, id.as_bytes(), wincode::serialize(state)?);
        }
        if let Some(pool) = &ops.pool {
            batch.put_cf(cf_pool, POOL_KEY, wincode::serialize(pool)?);
        }
        for vault in &ops.churn_vaults {
            batch.put_cf(cf_churn, [vault.index], wincode::serialize(vault)?);
        }
        for p in ops.pending_inserts.iter().chain(&ops.pending_updates) {
            batch.put_cf(cf_pending, p.recipient.as_bytes(), wincode::serialize(p)?);
        }
        for c in ops.commitment_inserts.iter().chain(&ops.commitment_updates) {
            batch.put_cf(cf_commitments, c.commitment.as_bytes(), wincode::serialize(c)?);
        }
        for n in &ops.nullifier_inserts {
            batch.put_cf(cf_nullifiers, n.nullifier.as_bytes(), wincode::serialize(n)?);
        }

        self.db.write(batch)?;
        Ok(())
    }
}
