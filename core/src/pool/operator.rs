//! Operator calls received over the network. Each carries the pool
//! authority's signature over a message bound to the current pool sequence,
//! so a captured call cannot be replayed once anything else settles.

use murk_account::AccountId;
use murk_keypair::{SettlementMessage, verify_signature};

use super::{ClaimBatch, PrivacyPool, Settlement};
use crate::error::{PoolError, Result};

impl PrivacyPool {
    /// Checks `signature` against the pool authority and returns it.
    fn signed_authority(
        &self,
        signature: &[u8],
        message: impl FnOnce(u64) -> SettlementMessage,
    ) -> Result<AccountId> {
        let pool = self.store.pool()?.ok_or(PoolError::PoolNotInitialized)?;
        verify_signature(&pool.authority, &message(pool.sequence), signature)?;
        Ok(pool.authority)
    }

    pub fn batch_claim_signed(
        &mut self,
        batch: &ClaimBatch,
        signature: &[u8],
    ) -> Result<Settlement> {
        let authority = self.signed_authority(signature, |sequence| SettlementMessage::BatchClaim {
            accounts: batch.accounts(),
            sequence,
        })?;
        self.batch_claim(authority, batch)
    }

    pub fn init_churn_vault_signed(&mut self, index: u8, signature: &[u8]) -> Result<Settlement> {
        let authority = self.signed_authority(signature, |sequence| {
            SettlementMessage::InitChurnVault { index, sequence }
        })?;
        self.init_churn_vault(authority, index)
    }

    pub fn churn_signed(&mut self, index: u8, amount: u64, signature: &[u8]) -> Result<Settlement> {
        let authority = self.signed_authority(signature, |sequence| SettlementMessage::Churn {
            index,
            amount,
            sequence,
        })?;
        self.churn(authority, index, amount)
    }

    pub fn unchurn_signed(
        &mut self,
        index: u8,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        let authority = self.signed_authority(signature, |sequence| SettlementMessage::Unchurn {
            index,
            amount,
            sequence,
        })?;
        self.unchurn(authority, index, amount)
    }
}
