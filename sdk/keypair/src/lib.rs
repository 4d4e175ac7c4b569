//! Murk keypairs.
//!
//! - [`Keypair`]: an ed25519 signing key whose public half is the account id.
//! - [`StealthKeyProvider`]: deterministic single-use recipient keys.
//! - [`SettlementMessage`]: the exact byte strings accounts sign so that a
//!   relayer can submit on their behalf, and that the pool authority signs
//!   for operator calls.

mod message;
mod stealth;

pub use message::{SettlementMessage, verify_signature};
pub use stealth::StealthKeyProvider;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey};
use murk_account::AccountId;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keypair file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("keypair file is not a JSON byte array: {0}")]
    Format(#[from] serde_json::Error),
    #[error("expected a 32-byte seed, got {0} bytes")]
    InvalidSeedLength(usize),
    #[error("malformed signature")]
    MalformedSignature,
    #[error("malformed public key")]
    MalformedPublicKey,
    #[error("signature does not match the declared signer and message")]
    SignerMismatch,
}

/// A user's signing key. Never expose the seed.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh random keypair from the OS CSPRNG.
    pub fn new_random() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Returns the public account id (the "address").
    pub fn account_id(&self) -> AccountId {
        AccountId(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    pub fn sign_message(&self, message: &SettlementMessage) -> [u8; 64] {
        self.sign(message.to_string().as_bytes())
    }

    /// Loads a keypair stored as a JSON array of seed bytes.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let raw = fs::read_to_string(path)?;
        let bytes: Vec<u8> = serde_json::from_str(&raw)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSeedLength(bytes.len()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Writes the seed as a JSON array. Refuses to overwrite.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), KeyError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(&self.to_seed().to_vec())?;

        let mut f = OpenOptions::new().write(true).create_new(true).open(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // chmod 600 (rw-------)
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        f.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair({})", self.account_id())
    }
}

/// Parses a 64-byte signature from raw bytes.
pub fn signature_from_slice(bytes: &[u8]) -> Result<Signature, KeyError> {
    Signature::from_slice(bytes).map_err(|_| KeyError::MalformedSignature)
}
