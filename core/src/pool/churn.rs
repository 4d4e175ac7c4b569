//! Churn vaults: operator-driven hops between the pool vault and three
//! internal vaults. When and how much to churn is left to the operator.

use log::info;
use murk_account::AccountId;

use super::{
    PrivacyPool, Settlement, SettlementKind, pool_vault_address,
    state::{CHURN_VAULT_COUNT, ChurnVaultState, churn_vault_address},
};
use crate::error::{PoolError, Result};

impl PrivacyPool {
    pub fn init_churn_vault(&mut self, authority: AccountId, index: u8) -> Result<Settlement> {
        let mut draft = self.draft()?;
        Self::require_authority(&draft, &authority)?;
        check_index(index)?;

        if draft.store().churn_vault(index)?.is_some() {
            return Err(PoolError::ChurnVaultExists(index));
        }
        draft.batch.churn_vaults.push(ChurnVaultState {
            index,
            ..ChurnVaultState::default()
        });

        let settlement = self.commit(draft, SettlementKind::InitChurnVault, &[index])?;
        info!("Churn vault {} initialized", index);
        Ok(settlement)
    }

    /// Moves `amount` from the pool vault into churn vault `index`.
    pub fn churn(&mut self, authority: AccountId, index: u8, amount: u64) -> Result<Settlement> {
        let mut draft = self.draft()?;
        Self::require_authority(&draft, &authority)?;
        check_index(index)?;
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let mut vault = draft
            .store()
            .churn_vault(index)?
            .ok_or(PoolError::ChurnVaultMissing(index))?;

        draft.transfer(
            &pool_vault_address(),
            &churn_vault_address(index),
            amount,
            |available| PoolError::InsufficientPoolFunds {
                needed: amount,
                available,
            },
        )?;

        vault.total_churned = vault
            .total_churned
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        vault.churn_count += 1;
        draft.pool.churn_count += 1;
        draft.batch.churn_vaults.push(vault);

        let settlement = self.commit(draft, SettlementKind::Churn, &[index])?;
        info!(
            "Churned {} lamports into vault {} (seq {})",
            amount, index, settlement.sequence
        );
        Ok(settlement)
    }

    /// Moves `amount` from churn vault `index` back to the pool vault.
    /// Counters are left as they are.
    pub fn unchurn(&mut self, authority: AccountId, index: u8, amount: u64) -> Result<Settlement> {
        let mut draft = self.draft()?;
        Self::require_authority(&draft, &authority)?;
        check_index(index)?;
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if draft.store().churn_vault(index)?.is_none() {
            return Err(PoolError::ChurnVaultMissing(index));
        }

        draft.transfer(
            &churn_vault_address(index),
            &pool_vault_address(),
            amount,
            |available| PoolError::InsufficientChurnFunds {
                index,
                needed: amount,
                available,
            },
        )?;

        let settlement = self.commit(draft, SettlementKind::Unchurn, &[index])?;
        info!(
            "Unchurned {} lamports from vault {} (seq {})",
            amount, index, settlement.sequence
        );
        Ok(settlement)
    }
}

fn check_index(index: u8) -> Result<()> {
    if index >= CHURN_VAULT_COUNT {
        return Err(PoolError::InvalidChurnIndex(index));
    }
    Ok(())
}
