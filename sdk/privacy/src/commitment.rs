//! Commitments and nullifiers
//!
//! ```text
//! secret_hash = SHA256(secret)
//! nullifier   = SHA256(nullifier_secret)
//! commitment  = SHA256(secret_hash || nullifier || amount_le)
//! ```
//!
//! The ledger only ever sees `secret_hash`, `nullifier` and `commitment`.
//! Knowing the two pre-images is what proves ownership of a deposit.

use std::fmt;
use std::str::FromStr;

use murk_account::{AccountId, AccountIdError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use wincode::{SchemaRead, SchemaWrite};

/// SHA-256 over the concatenation of `parts`.
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            SchemaRead, SchemaWrite, Serialize, Deserialize,
        )]
        pub struct $name(#[serde(with = "hex")] pub [u8; 32]);

        impl $name {
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Base58 form, the same encoding used for ledger addresses.
            pub fn to_bs58(&self) -> String {
                AccountId(self.0).to_bs58()
            }

            /// Accepts either 64 hex chars or a base58 string.
            pub fn parse(s: &str) -> Option<Self> {
                if s.len() == 64 {
                    if let Ok(bytes) = hex::decode(s) {
                        let mut out = [0u8; 32];
                        out.copy_from_slice(&bytes);
                        return Some(Self(out));
                    }
                }
                AccountId::from_str(s).ok().map(|id| Self(id.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = AccountIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or(AccountIdError::InvalidEncoding)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

hash_newtype!(
    /// `SHA256(secret)`, revealed at withdrawal time.
    SecretHash
);
hash_newtype!(
    /// `SHA256(nullifier_secret)`. Single-use withdrawal tag.
    Nullifier
);
hash_newtype!(
    /// Binding hash of a deposit.
    Commitment
);

impl SecretHash {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self(sha256(&[secret]))
    }
}

impl Nullifier {
    pub fn from_secret(nullifier_secret: &[u8; 32]) -> Self {
        Self(sha256(&[nullifier_secret]))
    }
}

impl Commitment {
    pub fn compute(secret_hash: &SecretHash, nullifier: &Nullifier, amount: u64) -> Self {
        Self(sha256(&[
            &secret_hash.0,
            &nullifier.0,
            &amount.to_le_bytes(),
        ]))
    }

    /// Record id used in signed `claim:` messages on the private path.
    pub fn record_id(&self) -> AccountId {
        AccountId(self.0)
    }
}
