//! Relayer
//!
//! Submits claims on behalf of recipients who only produced an off-chain
//! signature, so the recipient never appears as the submitter.
//!
//! ```text
//! recipient ──sign("claim:<record>")──> relayer ──verify──> PoolManager
//!                                          │                     │
//!                                          └── pays fee ─────────┘
//! ```

use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use murk_account::AccountId;
use murk_keypair::{Keypair, SettlementMessage, verify_signature};
use murk_privacy::{Commitment, Nullifier, SecretHash};
use thiserror::Error;

use crate::error::PoolError;
use crate::pool::{PoolManager, Settlement, pending_address};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relayer not configured")]
    NotConfigured,
    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerStatus {
    pub configured: bool,
    pub address: Option<AccountId>,
    pub balance: u64,
    pub settlement_fee: u64,
}

pub struct Relayer {
    keypair: Option<Keypair>,
}

impl Relayer {
    pub fn new(keypair: Option<Keypair>) -> Self {
        Self { keypair }
    }

    pub fn disabled() -> Self {
        Self { keypair: None }
    }

    /// Loads the relayer key from `path`, if one is configured.
    pub fn from_keypair_path(path: Option<&str>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            warn!("No relayer keypair configured, relay endpoints disabled");
            return Ok(Self::disabled());
        };
        let keypair = Keypair::from_file(Path::new(path))
            .with_context(|| format!("failed to load relayer keypair from {}", path))?;
        info!("Relayer key loaded: {}", keypair.account_id());
        Ok(Self::new(Some(keypair)))
    }

    pub fn is_configured(&self) -> bool {
        self.keypair.is_some()
    }

    pub fn address(&self) -> Option<AccountId> {
        self.keypair.as_ref().map(Keypair::account_id)
    }

    fn require_address(&self) -> Result<AccountId, RelayError> {
        self.address().ok_or(RelayError::NotConfigured)
    }

    /// Submits a legacy claim for `recipient`. `record` must be the
    /// recipient's pending record address.
    pub async fn relay_claim(
        &self,
        pool: &PoolManager,
        record: AccountId,
        recipient: AccountId,
        signature: &[u8],
    ) -> Result<Settlement, RelayError> {
        let relayer = self.require_address()?;

        // Out-of-band check before taking the pool lock.
        verify_signature(&recipient, &SettlementMessage::Claim { record }, signature)
            .map_err(PoolError::from)?;
        if record != pending_address(&recipient) {
            return Err(PoolError::RecordMismatch { record, recipient }.into());
        }

        Ok(pool
            .claim_withdrawal_relayed(relayer, recipient, signature)
            .await?)
    }

    /// Submits a private withdrawal for `recipient`. `commitment` must match
    /// the one recomputed from the revealed values.
    #[allow(clippy::too_many_arguments)]
    pub async fn relay_private_claim(
        &self,
        pool: &PoolManager,
        commitment: Commitment,
        secret_hash: SecretHash,
        nullifier: Nullifier,
        amount: u64,
        recipient: AccountId,
        signature: &[u8],
    ) -> Result<Settlement, RelayError> {
        let relayer = self.require_address()?;

        let record = commitment.record_id();
        verify_signature(&recipient, &SettlementMessage::Claim { record }, signature)
            .map_err(PoolError::from)?;
        if Commitment::compute(&secret_hash, &nullifier, amount) != commitment {
            return Err(PoolError::RecordMismatch { record, recipient }.into());
        }

        Ok(pool
            .withdraw_relayed(relayer, secret_hash, nullifier, amount, recipient, signature)
            .await?)
    }

    pub async fn status(&self, pool: &PoolManager) -> Result<RelayerStatus, RelayError> {
        let address = self.address();
        let balance = match &address {
            Some(a) => pool.balance(a).await?,
            None => 0,
        };
        Ok(RelayerStatus {
            configured: address.is_some(),
            address,
            balance,
            settlement_fee: pool.settlement_fee().await,
        })
    }
}
