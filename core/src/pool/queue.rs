//! Delayed withdrawal queue (legacy path).
//!
//! ```text
//! request ──> PendingWithdrawal { available_at = now + U[30, 300] }
//!                       │
//!              now >= available_at
//!                       ▼
//! claim   ──> pay recipient, claimed = true (never deleted)
//! ```

use log::info;
use murk_account::AccountId;
use rand::Rng;

use super::{
    Draft, PrivacyPool, Settlement, SettlementKind, pool_vault_address,
    state::{MAX_DELAY_SECONDS, MIN_DELAY_SECONDS, PendingWithdrawal, pending_address},
};
use crate::error::{PoolError, Result};

impl PrivacyPool {
    /// Plain deposit into the pool vault, without a commitment.
    pub fn pool_deposit(&mut self, depositor: AccountId, amount: u64) -> Result<Settlement> {
        Self::require_standard(amount)?;
        let mut draft = self.draft()?;

        draft.transfer(&depositor, &pool_vault_address(), amount, |available| {
            PoolError::InsufficientBalance {
                needed: amount,
                available,
            }
        })?;
        draft.record_deposit(amount)?;

        let settlement = self.commit(draft, SettlementKind::PoolDeposit, depositor.as_bytes())?;
        info!("Pool deposit {} lamports (seq {})", amount, settlement.sequence);
        Ok(settlement)
    }

    /// Opens the single pending record of `recipient`. Moves no funds.
    pub fn request_withdrawal(&mut self, recipient: AccountId, amount: u64) -> Result<Settlement> {
        Self::require_standard(amount)?;
        let mut draft = self.draft()?;

        if draft.store().pending(&recipient)?.is_some() {
            return Err(PoolError::PendingExists(recipient));
        }
        let available = draft.balance(&pool_vault_address())?;
        if available < amount {
            return Err(PoolError::InsufficientPoolFunds {
                needed: amount,
                available,
            });
        }

        let requested_at = self.now();
        let delay = rand::thread_rng().gen_range(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS);
        let record = PendingWithdrawal {
            recipient,
            amount,
            requested_at,
            available_at: requested_at + delay,
            claimed: false,
        };
        draft.batch.pending_inserts.push(record);

        let address = pending_address(&recipient);
        let settlement = self.commit(draft, SettlementKind::RequestWithdrawal, address.as_bytes())?;
        info!(
            "Withdrawal requested: record {} available in {}s (seq {})",
            address, delay, settlement.sequence
        );
        Ok(settlement)
    }

    /// Pays out a ready pending record to its recipient.
    pub fn claim_withdrawal(&mut self, recipient: AccountId) -> Result<Settlement> {
        let mut draft = self.draft()?;
        let amount = self.stage_claim(&mut draft, &recipient)?;
        self.finish_claim(draft, &recipient, amount)
    }

    pub(crate) fn stage_claim(&self, draft: &mut Draft<'_>, recipient: &AccountId) -> Result<u64> {
        let record = draft
            .store()
            .pending(recipient)?
            .ok_or(PoolError::NoPendingWithdrawal(*recipient))?;
        if record.claimed {
            return Err(PoolError::AlreadyClaimed);
        }
        let now = self.now();
        if !record.is_ready(now) {
            return Err(PoolError::NotReady {
                available_at: record.available_at,
                now,
            });
        }

        draft.transfer(&pool_vault_address(), recipient, record.amount, |available| {
            PoolError::InsufficientPoolFunds {
                needed: record.amount,
                available,
            }
        })?;
        draft.batch.pending_updates.push(PendingWithdrawal {
            claimed: true,
            ..record
        });
        draft.record_withdrawal(record.amount)?;
        Ok(record.amount)
    }

    pub(crate) fn finish_claim(
        &self,
        draft: Draft<'_>,
        recipient: &AccountId,
        amount: u64,
    ) -> Result<Settlement> {
        let address = pending_address(recipient);
        let settlement = self.commit(draft, SettlementKind::ClaimWithdrawal, address.as_bytes())?;
        info!(
            "Claimed {} lamports from record {} (seq {})",
            amount, address, settlement.sequence
        );
        Ok(settlement)
    }
}
