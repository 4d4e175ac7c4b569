//! Privacy Pool
//!
//! Settlement engine for the commitment/nullifier pool. Every operation
//! follows the same shape:
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ load state │──>│ validate (no I/O │──>│ stage writes │──>│ store.apply  │
//! │  (Draft)   │   │   side effects)  │   │ (LedgerBatch)│   │  (atomic)    │
//! └────────────┘   └──────────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Nothing reaches the store until every check of the operation has passed,
//! so a rejected operation leaves no partial state behind.
//!
//! [`PrivacyPool`] is the single writer: mutating operations take `&mut self`.
//! Use [`PoolManager`] to share it between async tasks.

mod batch;
mod churn;
mod commitment;
mod manager;
mod operator;
mod queue;
mod relay;
pub mod state;

pub use batch::{ClaimBatch, ClaimPair};
pub use manager::PoolManager;
pub use state::{
    CHURN_VAULT_COUNT, ChurnVaultState, CommitmentRecord, MAX_BATCH_PAIRS, MAX_DELAY_SECONDS,
    MIN_DELAY_SECONDS, NullifierRecord, PendingWithdrawal, PoolAggregate, churn_vault_address,
    fee_collector_address, pending_address, pool_vault_address,
};

use std::sync::Arc;

use log::info;
use murk_account::{AccountId, AccountState};
use murk_privacy::{Commitment, Denomination, Nullifier};

use crate::clock::Clock;
use crate::error::{PoolError, Result};
use crate::storage::{
    CF_COMMITMENTS, CF_NULLIFIERS, CF_PENDING, DuplicateKey, LedgerBatch, LedgerStore,
};

/// Default fee a relayer pays per relayed settlement, in lamports.
pub const DEFAULT_SETTLEMENT_FEE: u64 = 5_000;

// ============================================================================
// Settlements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    InitPool,
    Deposit,
    PoolDeposit,
    Withdraw,
    RequestWithdrawal,
    ClaimWithdrawal,
    BatchClaim,
    InitChurnVault,
    Churn,
    Unchurn,
}

impl SettlementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitPool => "init_pool",
            Self::Deposit => "deposit",
            Self::PoolDeposit => "pool_deposit",
            Self::Withdraw => "withdraw",
            Self::RequestWithdrawal => "request_withdrawal",
            Self::ClaimWithdrawal => "claim_withdrawal",
            Self::BatchClaim => "batch_claim",
            Self::InitChurnVault => "init_churn_vault",
            Self::Churn => "churn",
            Self::Unchurn => "unchurn",
        }
    }
}

/// Receipt of a committed settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// `blake3(sequence || kind || subject)`
    pub reference: [u8; 32],
    /// Pool sequence after this settlement.
    pub sequence: u64,
    pub kind: SettlementKind,
}

impl Settlement {
    fn new(sequence: u64, kind: SettlementKind, subject: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("murk settlement v1");
        hasher.update(&sequence.to_le_bytes());
        hasher.update(kind.as_str().as_bytes());
        hasher.update(subject);
        Self {
            reference: *hasher.finalize().as_bytes(),
            sequence,
            kind,
        }
    }

    pub fn reference_bs58(&self) -> String {
        bs58::encode(self.reference).into_string()
    }
}

/// Snapshot of the pool for status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub aggregate: PoolAggregate,
    pub vault_balance: u64,
    pub churn_balances: [u64; CHURN_VAULT_COUNT as usize],
}

impl PoolStats {
    /// Pool vault plus every churn vault.
    pub fn total_liquidity(&self) -> u64 {
        self.vault_balance + self.churn_balances.iter().sum::<u64>()
    }
}

// ============================================================================
// Draft
// ============================================================================

/// Working set of one settlement. Balance reads see earlier transfers of the
/// same operation.
pub(crate) struct Draft<'a> {
    store: &'a dyn LedgerStore,
    pub(crate) pool: PoolAggregate,
    pub(crate) batch: LedgerBatch,
}

impl<'a> Draft<'a> {
    fn open(store: &'a dyn LedgerStore) -> Result<Self> {
        let pool = store.pool()?.ok_or(PoolError::PoolNotInitialized)?;
        Ok(Self {
            store,
            pool,
            batch: LedgerBatch::default(),
        })
    }

    pub(crate) fn store(&self) -> &'a dyn LedgerStore {
        self.store
    }

    pub(crate) fn balance(&self, id: &AccountId) -> Result<u64> {
        if let Some((_, state)) = self.batch.accounts.iter().find(|(k, _)| k == id) {
            return Ok(state.balance);
        }
        Ok(self.store.account(id)?.balance)
    }

    /// Moves `amount` from `from` to `to`. `short` builds the error when
    /// `from` cannot cover it.
    pub(crate) fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
        short: impl FnOnce(u64) -> PoolError,
    ) -> Result<()> {
        let available = self.balance(from)?;
        if available < amount {
            return Err(short(available));
        }
        let to_balance = self
            .balance(to)?
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;

        self.batch.put_account(
            *from,
            AccountState {
                balance: available - amount,
            },
        );
        self.batch.put_account(*to, AccountState { balance: to_balance });
        Ok(())
    }

    pub(crate) fn record_withdrawal(&mut self, amount: u64) -> Result<()> {
        self.pool.total_withdrawn = self
            .pool
            .total_withdrawn
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        self.pool.withdraw_count += 1;
        Ok(())
    }

    pub(crate) fn record_deposit(&mut self, amount: u64) -> Result<()> {
        self.pool.total_deposited = self
            .pool
            .total_deposited
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        self.pool.deposit_count += 1;
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct PrivacyPool {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    settlement_fee: u64,
}

impl PrivacyPool {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            settlement_fee: DEFAULT_SETTLEMENT_FEE,
        }
    }

    pub fn with_settlement_fee(mut self, fee: u64) -> Self {
        self.settlement_fee = fee;
        self
    }

    pub fn settlement_fee(&self) -> u64 {
        self.settlement_fee
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Creates the pool aggregate. `authority` becomes the operator.
    pub fn init_pool(&mut self, authority: AccountId) -> Result<Settlement> {
        if self.store.pool()?.is_some() {
            return Err(PoolError::PoolAlreadyInitialized);
        }
        let draft = Draft {
            store: self.store.as_ref(),
            pool: PoolAggregate {
                authority,
                ..PoolAggregate::default()
            },
            batch: LedgerBatch::default(),
        };
        let settlement = self.commit(draft, SettlementKind::InitPool, authority.as_bytes())?;
        info!("Pool initialized (authority {})", authority);
        Ok(settlement)
    }

    pub(crate) fn draft(&self) -> Result<Draft<'_>> {
        Draft::open(self.store.as_ref())
    }

    pub(crate) fn require_authority(draft: &Draft<'_>, caller: &AccountId) -> Result<()> {
        if draft.pool.authority != *caller {
            return Err(PoolError::Unauthorized);
        }
        Ok(())
    }

    pub(crate) fn require_standard(amount: u64) -> Result<()> {
        if !Denomination::is_standard(amount) {
            return Err(PoolError::NonStandardAmount(amount));
        }
        Ok(())
    }

    /// Debits the relayer for a relayed settlement.
    pub(crate) fn charge_fee(&self, draft: &mut Draft<'_>, relayer: &AccountId) -> Result<()> {
        let fee = self.settlement_fee;
        if fee == 0 {
            return Ok(());
        }
        draft.transfer(relayer, &fee_collector_address(), fee, |available| {
            PoolError::InsufficientRelayerFunds { fee, available }
        })
    }

    /// Bumps the sequence and writes the draft in one atomic batch.
    pub(crate) fn commit(
        &self,
        mut draft: Draft<'_>,
        kind: SettlementKind,
        subject: &[u8],
    ) -> Result<Settlement> {
        draft.pool.sequence += 1;
        let sequence = draft.pool.sequence;
        draft.batch.pool = Some(draft.pool);

        self.store.apply(draft.batch).map_err(map_store_error)?;
        Ok(Settlement::new(sequence, kind, subject))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn stats(&self) -> Result<PoolStats> {
        let aggregate = self.store.pool()?.ok_or(PoolError::PoolNotInitialized)?;
        let mut churn_balances = [0u64; CHURN_VAULT_COUNT as usize];
        for (i, slot) in churn_balances.iter_mut().enumerate() {
            *slot = self.balance(&churn_vault_address(i as u8))?;
        }
        Ok(PoolStats {
            aggregate,
            vault_balance: self.balance(&pool_vault_address())?,
            churn_balances,
        })
    }

    pub fn pending(&self, recipient: &AccountId) -> Result<Option<PendingWithdrawal>> {
        Ok(self.store.pending(recipient)?)
    }

    pub fn commitment(&self, commitment: &Commitment) -> Result<Option<CommitmentRecord>> {
        Ok(self.store.commitment(commitment)?)
    }

    /// A nullifier is used iff its record exists.
    pub fn nullifier_used(&self, nullifier: &Nullifier) -> Result<bool> {
        Ok(self.store.nullifier(nullifier)?.is_some())
    }

    pub fn churn_vault(&self, index: u8) -> Result<Option<ChurnVaultState>> {
        Ok(self.store.churn_vault(index)?)
    }

    pub fn balance(&self, account: &AccountId) -> Result<u64> {
        Ok(self.store.account(account)?.balance)
    }

    // ------------------------------------------------------------------------
    // Dev
    // ------------------------------------------------------------------------

    /// Mints test balance. Does not touch the pool aggregate.
    pub fn airdrop(&mut self, account: AccountId, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let balance = self
            .balance(&account)?
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        let mut batch = LedgerBatch::default();
        batch.put_account(account, AccountState { balance });
        self.store.apply(batch)?;
        info!("Airdropped {} lamports to {}", amount, account);
        Ok(balance)
    }
}

/// Turns a store-level duplicate insert into the matching conflict.
fn map_store_error(err: anyhow::Error) -> PoolError {
    match err.downcast::<DuplicateKey>() {
        Ok(dup) => match dup.table {
            CF_NULLIFIERS => PoolError::NullifierUsed,
            CF_COMMITMENTS => PoolError::CommitmentExists(Commitment(dup.key)),
            CF_PENDING => PoolError::PendingExists(AccountId(dup.key)),
            _ => PoolError::Storage(anyhow::Error::new(dup)),
        },
        Err(other) => PoolError::Storage(other),
    }
}
