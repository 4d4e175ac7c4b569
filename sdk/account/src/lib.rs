//! Account identities and derived addresses.
//!
//! Every identity on the ledger is a 32-byte value: user accounts are ed25519
//! public keys, while vaults and records live at addresses derived from a
//! list of seeds.
//!
//! ```text
//! address = SHA256( seed_0 || seed_1 || ... || seed_n )
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use wincode::{SchemaRead, SchemaWrite};

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A 32-byte ledger identity (account, vault or record address).
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    SchemaRead,
    SchemaWrite,
    Serialize,
    Deserialize,
)]
pub struct AccountId(pub [u8; 32]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountIdError {
    #[error("invalid base58 encoding")]
    InvalidEncoding,
    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl AccountId {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bs58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Build from a byte slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AccountIdError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AccountIdError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Deterministically derives an address from seeds.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        Self(hasher.finalize().into())
    }

    /// Address of the delayed-withdrawal record owned by this account.
    pub fn pending_record(&self) -> Self {
        Self::derive(&[b"pending", &self.0])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bs58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_bs58())
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AccountIdError::InvalidEncoding)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Balance held by an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bs58_round_trip() {
        let id = AccountId([7u8; 32]);
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_short_ids() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert_eq!(
            short.parse::<AccountId>(),
            Err(AccountIdError::InvalidLength(16))
        );
        assert_eq!(
            "0OIl".parse::<AccountId>(),
            Err(AccountIdError::InvalidEncoding)
        );
    }

    #[test]
    fn derived_addresses_depend_on_every_seed() {
        let a = AccountId::derive(&[b"churn_vault", &[0]]);
        let b = AccountId::derive(&[b"churn_vault", &[1]]);
        let c = AccountId::derive(&[b"churn_vault", &[0]]);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn pending_record_is_per_owner() {
        let a = AccountId([1; 32]);
        assert_eq!(a.pending_record(), AccountId([1; 32]).pending_record());
        assert_ne!(a.pending_record(), AccountId([2; 32]).pending_record());
        assert_ne!(a.pending_record(), a);
    }
}
