//! Gasless relay: a relayer submits on behalf of a recipient who only
//! signed `claim:<record-id>`. The relayer pays the settlement fee.

use log::info;
use murk_account::AccountId;
use murk_keypair::{SettlementMessage, verify_signature};
use murk_privacy::{Commitment, Nullifier, SecretHash};

use super::{PrivacyPool, Settlement, state::pending_address};
use crate::error::Result;

impl PrivacyPool {
    /// Claims `recipient`'s pending record with their signature over
    /// `claim:<pending address>`.
    pub fn claim_withdrawal_relayed(
        &mut self,
        relayer: AccountId,
        recipient: AccountId,
        signature: &[u8],
    ) -> Result<Settlement> {
        let message = SettlementMessage::Claim {
            record: pending_address(&recipient),
        };
        verify_signature(&recipient, &message, signature)?;

        let mut draft = self.draft()?;
        let amount = self.stage_claim(&mut draft, &recipient)?;
        self.charge_fee(&mut draft, &relayer)?;
        let settlement = self.finish_claim(draft, &recipient, amount)?;
        info!("Relayed claim by {} (fee {})", relayer, self.settlement_fee());
        Ok(settlement)
    }

    /// Private withdrawal with the recipient's signature over
    /// `claim:<commitment>`.
    pub fn withdraw_relayed(
        &mut self,
        relayer: AccountId,
        secret_hash: SecretHash,
        nullifier: Nullifier,
        amount: u64,
        recipient: AccountId,
        signature: &[u8],
    ) -> Result<Settlement> {
        let commitment = Commitment::compute(&secret_hash, &nullifier, amount);
        let message = SettlementMessage::Claim {
            record: commitment.record_id(),
        };
        verify_signature(&recipient, &message, signature)?;

        let mut draft = self.draft()?;
        self.stage_withdraw(&mut draft, &secret_hash, &nullifier, amount, &recipient)?;
        self.charge_fee(&mut draft, &relayer)?;
        let settlement = self.finish_withdraw(draft, commitment, amount)?;
        info!("Relayed withdrawal by {} (fee {})", relayer, self.settlement_fee());
        Ok(settlement)
    }

    /// Deposit authorized by the depositor's signature over
    /// `deposit:<commitment>:<amount>`. The depositor pays.
    pub fn deposit_signed(
        &mut self,
        depositor: AccountId,
        commitment: Commitment,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        let message = SettlementMessage::Deposit {
            commitment: commitment.record_id(),
            amount,
        };
        verify_signature(&depositor, &message, signature)?;
        self.deposit(depositor, commitment, amount)
    }

    /// Withdrawal request authorized by the recipient's signature over
    /// `request:<pending address>:<amount>`.
    pub fn request_withdrawal_signed(
        &mut self,
        recipient: AccountId,
        amount: u64,
        signature: &[u8],
    ) -> Result<Settlement> {
        let message = SettlementMessage::Request {
            record: pending_address(&recipient),
            amount,
        };
        verify_signature(&recipient, &message, signature)?;
        self.request_withdrawal(recipient, amount)
    }
}
