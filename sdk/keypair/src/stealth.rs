//! Stealth recipient keys
//!
//! ```text
//! seed_i = SHA256("murk:stealth:v1" || master_seed || i as u32 LE)
//! key_i  = ed25519(seed_i)
//! ```
//!
//! Each index is meant to receive exactly one withdrawal. Reusing an index
//! links the withdrawals that went to it.

use sha2::{Digest, Sha256};

use crate::Keypair;

const STEALTH_DOMAIN: &[u8] = b"murk:stealth:v1";

pub struct StealthKeyProvider {
    master_seed: [u8; 32],
}

impl StealthKeyProvider {
    pub fn new(master_seed: [u8; 32]) -> Self {
        Self { master_seed }
    }

    /// Uses the seed of an existing keypair as the master seed.
    pub fn from_keypair(keypair: &Keypair) -> Self {
        Self::new(keypair.to_seed())
    }

    pub fn derive(&self, index: u32) -> Keypair {
        let mut hasher = Sha256::new();
        hasher.update(STEALTH_DOMAIN);
        hasher.update(self.master_seed);
        hasher.update(index.to_le_bytes());
        let seed: [u8; 32] = hasher.finalize().into();
        Keypair::from_seed(&seed)
    }
}
