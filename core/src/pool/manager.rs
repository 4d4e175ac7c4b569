//! Thread-safe handle over the single-writer [`PrivacyPool`].

use std::sync::Arc;

use murk_account::AccountId;
use murk_privacy::{Commitment, Nullifier, SecretHash};
use tokio::sync::Mutex;

use super::{
    ChurnVaultState, ClaimBatch, CommitmentRecord, PendingWithdrawal, PoolStats, PrivacyPool,
    Settlement,
};
use crate::error::Result;

/// Serializes every settlement behind one async mutex.
#[derive(Clone)]
pub struct PoolManager {
    inner: Arc<Mutex<PrivacyPool>>,
}

impl PoolManager {
    pub fn new(pool: PrivacyPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    pub async fn init_pool(&self, authority: AccountId) -> Result<Settlement> {
        self.inner.lock().await.init_pool(authority)
    }

    pub async fn deposit(
        &self,
        depositor: AccountId,
        commitment: Commitment,
        amount: u64,
    ) -> Result<Settlement> {
        self.inner.lock().await.deposit(depositor, commitment, amount)
    }

    pub async fn deposit_signed(
        &self,
        depositor: AccountId,
        commitment: Commitment,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner
            .lock()
            .await
            .deposit_signed(depositor, commitment, amount, signature)
    }

    pub async fn withdraw(
        &self,
        secret_hash: SecretHash,
        nullifier: Nullifier,
        amount: u64,
        recipient: AccountId,
    ) -> Result<Settlement> {
        self.inner
            .lock()
            .await
            .withdraw(secret_hash, nullifier, amount, recipient)
    }

    pub async fn pool_deposit(&self, depositor: AccountId, amount: u64) -> Result<Settlement> {
        self.inner.lock().await.pool_deposit(depositor, amount)
    }

    pub async fn request_withdrawal(
        &self,
        recipient: AccountId,
        amount: u64,
    ) -> Result<Settlement> {
        self.inner.lock().await.request_withdrawal(recipient, amount)
    }

    pub async fn request_withdrawal_signed(
        &self,
        recipient: AccountId,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner
            .lock()
            .await
            .request_withdrawal_signed(recipient, amount, signature)
    }

    pub async fn claim_withdrawal(&self, recipient: AccountId) -> Result<Settlement> {
        self.inner.lock().await.claim_withdrawal(recipient)
    }

    pub async fn claim_withdrawal_relayed(
        &self,
        relayer: AccountId,
        recipient: AccountId,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner
            .lock()
            .await
            .claim_withdrawal_relayed(relayer, recipient, signature)
    }

    pub async fn withdraw_relayed(
        &self,
        relayer: AccountId,
        secret_hash: SecretHash,
        nullifier: Nullifier,
        amount: u64,
        recipient: AccountId,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner.lock().await.withdraw_relayed(
            relayer,
            secret_hash,
            nullifier,
            amount,
            recipient,
            signature,
        )
    }

    pub async fn batch_claim_signed(
        &self,
        batch: &ClaimBatch,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner.lock().await.batch_claim_signed(batch, signature)
    }

    pub async fn init_churn_vault_signed(&self, index: u8, signature: &[u8]) -> Result<Settlement> {
        self.inner.lock().await.init_churn_vault_signed(index, signature)
    }

    pub async fn churn_signed(
        &self,
        index: u8,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner.lock().await.churn_signed(index, amount, signature)
    }

    pub async fn unchurn_signed(
        &self,
        index: u8,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        self.inner.lock().await.unchurn_signed(index, amount, signature)
    }

    pub async fn airdrop(&self, account: AccountId, amount: u64) -> Result<u64> {
        self.inner.lock().await.airdrop(account, amount)
    }

    // Reads

    pub async fn stats(&self) -> Result<PoolStats> {
        self.inner.lock().await.stats()
    }

    pub async fn pending(&self, recipient: &AccountId) -> Result<Option<PendingWithdrawal>> {
        self.inner.lock().await.pending(recipient)
    }

    pub async fn commitment(&self, commitment: &Commitment) -> Result<Option<CommitmentRecord>> {
        self.inner.lock().await.commitment(commitment)
    }

    pub async fn nullifier_used(&self, nullifier: &Nullifier) -> Result<bool> {
        self.inner.lock().await.nullifier_used(nullifier)
    }

    pub async fn churn_vault(&self, index: u8) -> Result<Option<ChurnVaultState>> {
        self.inner.lock().await.churn_vault(index)
    }

    pub async fn balance(&self, account: &AccountId) -> Result<u64> {
        self.inner.lock().await.balance(account)
    }

    pub async fn settlement_fee(&self) -> u64 {
        self.inner.lock().await.settlement_fee()
    }
}
