//! Commitment–nullifier engine: private deposits and withdrawals.

use log::info;
use murk_account::AccountId;
use murk_privacy::{Commitment, Nullifier, SecretHash};

use super::{
    Draft, PrivacyPool, Settlement, SettlementKind, pool_vault_address,
    state::{CommitmentRecord, NullifierRecord},
};
use crate::error::{PoolError, Result};

impl PrivacyPool {
    /// Publishes `commitment` and moves `amount` from `depositor` into the
    /// pool vault.
    pub fn deposit(
        &mut self,
        depositor: AccountId,
        commitment: Commitment,
        amount: u64,
    ) -> Result<Settlement> {
        Self::require_standard(amount)?;
        let mut draft = self.draft()?;

        if draft.store().commitment(&commitment)?.is_some() {
            return Err(PoolError::CommitmentExists(commitment));
        }

        draft.transfer(&depositor, &pool_vault_address(), amount, |available| {
            PoolError::InsufficientBalance {
                needed: amount,
                available,
            }
        })?;
        draft.batch.commitment_inserts.push(CommitmentRecord {
            commitment,
            amount,
            timestamp: self.now(),
            spent: false,
        });
        draft.record_deposit(amount)?;

        let settlement = self.commit(draft, SettlementKind::Deposit, commitment.as_bytes())?;
        info!(
            "Deposit {} lamports, commitment {:?} (seq {})",
            amount, commitment, settlement.sequence
        );
        Ok(settlement)
    }

    /// Spends the note behind `(secret_hash, nullifier, amount)` to
    /// `recipient`. Anyone holding those values may submit.
    pub fn withdraw(
        &mut self,
        secret_hash: SecretHash,
        nullifier: Nullifier,
        amount: u64,
        recipient: AccountId,
    ) -> Result<Settlement> {
        let mut draft = self.draft()?;
        let commitment =
            self.stage_withdraw(&mut draft, &secret_hash, &nullifier, amount, &recipient)?;
        self.finish_withdraw(draft, commitment, amount)
    }

    /// Validates a withdrawal and stages its writes.
    pub(crate) fn stage_withdraw(
        &self,
        draft: &mut Draft<'_>,
        secret_hash: &SecretHash,
        nullifier: &Nullifier,
        amount: u64,
        recipient: &AccountId,
    ) -> Result<Commitment> {
        let commitment = Commitment::compute(secret_hash, nullifier, amount);

        let record = draft
            .store()
            .commitment(&commitment)?
            .ok_or(PoolError::UnknownCommitment)?;
        if record.spent {
            return Err(PoolError::CommitmentSpent);
        }
        if draft.store().nullifier(nullifier)?.is_some() {
            return Err(PoolError::NullifierUsed);
        }

        draft.transfer(&pool_vault_address(), recipient, amount, |available| {
            PoolError::InsufficientPoolFunds {
                needed: amount,
                available,
            }
        })?;

        let now = self.now();
        draft.batch.nullifier_inserts.push(NullifierRecord {
            nullifier: *nullifier,
            used_at: now,
        });
        draft.batch.commitment_updates.push(CommitmentRecord {
            spent: true,
            ..record
        });
        draft.record_withdrawal(amount)?;
        Ok(commitment)
    }

    pub(crate) fn finish_withdraw(
        &self,
        draft: Draft<'_>,
        commitment: Commitment,
        amount: u64,
    ) -> Result<Settlement> {
        let settlement = self.commit(draft, SettlementKind::Withdraw, commitment.as_bytes())?;
        info!(
            "Withdrawal {} lamports from commitment {:?} (seq {})",
            amount, commitment, settlement.sequence
        );
        Ok(settlement)
    }
}
