//! Batch claims: up to five ready withdrawals settled in one write.

use std::collections::HashSet;

use log::info;
use murk_account::AccountId;

use super::{
    PrivacyPool, Settlement, SettlementKind,
    state::{MAX_BATCH_PAIRS, pending_address},
};
use crate::error::{PoolError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPair {
    /// Pending record address; must be `pending_address(recipient)`.
    pub record: AccountId,
    pub recipient: AccountId,
}

impl ClaimPair {
    pub fn for_recipient(recipient: AccountId) -> Self {
        Self {
            record: pending_address(&recipient),
            recipient,
        }
    }
}

/// 1 to [`MAX_BATCH_PAIRS`] claim pairs, checked at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimBatch {
    pairs: Vec<ClaimPair>,
}

impl ClaimBatch {
    pub fn new(pairs: Vec<ClaimPair>) -> Result<Self> {
        if pairs.is_empty() || pairs.len() > MAX_BATCH_PAIRS {
            return Err(PoolError::BatchSize(pairs.len()));
        }
        Ok(Self { pairs })
    }

    /// Builds a batch from `[record_0, recipient_0, record_1, recipient_1, ..]`.
    pub fn from_flat(accounts: &[AccountId]) -> Result<Self> {
        if accounts.len() % 2 != 0 {
            return Err(PoolError::BatchUnpaired(accounts.len()));
        }
        let pairs = accounts
            .chunks_exact(2)
            .map(|c| ClaimPair {
                record: c[0],
                recipient: c[1],
            })
            .collect();
        Self::new(pairs)
    }

    /// Flattened `[record_0, recipient_0, ..]`, the inverse of [`Self::from_flat`].
    pub fn accounts(&self) -> Vec<AccountId> {
        self.pairs
            .iter()
            .flat_map(|p| [p.record, p.recipient])
            .collect()
    }

    pub fn pairs(&self) -> &[ClaimPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PrivacyPool {
    /// Pays every pair of `batch` or none of them.
    pub fn batch_claim(&mut self, authority: AccountId, batch: &ClaimBatch) -> Result<Settlement> {
        let mut draft = self.draft()?;
        Self::require_authority(&draft, &authority)?;

        let mut seen = HashSet::new();
        let mut total = 0u64;
        for (index, pair) in batch.pairs().iter().enumerate() {
            if pair.record != pending_address(&pair.recipient) {
                return Err(PoolError::RecordMismatch {
                    record: pair.record,
                    recipient: pair.recipient,
                }
                .at_pair(index));
            }
            if !seen.insert(pair.recipient) {
                return Err(PoolError::DuplicateRecipient(pair.recipient).at_pair(index));
            }
            let amount = self
                .stage_claim(&mut draft, &pair.recipient)
                .map_err(|e| e.at_pair(index))?;
            total += amount;
        }

        let subject: Vec<u8> = batch
            .pairs()
            .iter()
            .flat_map(|p| p.record.0)
            .collect();
        let settlement = self.commit(draft, SettlementKind::BatchClaim, &subject)?;
        info!(
            "Batch claim settled {} withdrawals, {} lamports (seq {})",
            batch.len(),
            total,
            settlement.sequence
        );
        Ok(settlement)
    }
}
