//! Ledger records and derived addresses.

use murk_account::AccountId;
use murk_privacy::{Commitment, Nullifier};
use wincode::{SchemaRead, SchemaWrite};

/// Number of churn vaults.
pub const CHURN_VAULT_COUNT: u8 = 3;

/// Bounds of the randomized claim delay, in seconds (inclusive).
pub const MIN_DELAY_SECONDS: i64 = 30;
pub const MAX_DELAY_SECONDS: i64 = 300;

/// Maximum number of pairs in one batch claim.
pub const MAX_BATCH_PAIRS: usize = 5;

// ============================================================================
// Addresses
// ============================================================================

pub fn pool_vault_address() -> AccountId {
    AccountId::derive(&[b"pool_vault"])
}

pub fn churn_vault_address(index: u8) -> AccountId {
    AccountId::derive(&[b"churn_vault", &[index]])
}

pub fn fee_collector_address() -> AccountId {
    AccountId::derive(&[b"fee_collector"])
}

/// Address of the pending withdrawal record owned by `recipient`.
pub fn pending_address(recipient: &AccountId) -> AccountId {
    recipient.pending_record()
}

// ============================================================================
// Records
// ============================================================================

/// Pool-wide totals. Holds no per-user identity besides the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct PoolAggregate {
    pub authority: AccountId,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub churn_count: u64,
    /// Bumped by one on every settlement.
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct PendingWithdrawal {
    pub recipient: AccountId,
    pub amount: u64,
    pub requested_at: i64,
    /// Fixed at request time, never recomputed.
    pub available_at: i64,
    pub claimed: bool,
}

impl PendingWithdrawal {
    pub fn address(&self) -> AccountId {
        pending_address(&self.recipient)
    }

    pub fn is_ready(&self, now: i64) -> bool {
        now >= self.available_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct CommitmentRecord {
    pub commitment: Commitment,
    pub amount: u64,
    pub timestamp: i64,
    /// Mirror of nullifier existence, written in the same batch.
    pub spent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct NullifierRecord {
    pub nullifier: Nullifier,
    pub used_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct ChurnVaultState {
    pub index: u8,
    pub total_churned: u64,
    pub churn_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_distinct() {
        let mut all = vec![pool_vault_address(), fee_collector_address()];
        all.extend((0..CHURN_VAULT_COUNT).map(churn_vault_address));
        all.push(pending_address(&AccountId([1u8; 32])));
        all.push(pending_address(&AccountId([2u8; 32])));

        let mut dedup = all.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), all.len());
    }

    #[test]
    fn test_ready_boundary() {
        let p = PendingWithdrawal {
            recipient: AccountId::default(),
            amount: 100_000_000,
            requested_at: 1_000,
            available_at: 1_030,
            claimed: false,
        };
        assert!(!p.is_ready(1_029));
        assert!(p.is_ready(1_030));
    }
}
