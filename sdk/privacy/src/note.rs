//! Private Notes
//!
//! A note is the client's proof of a deposit. It holds the two secrets whose
//! hashes make up the commitment, plus the public values derived from them.

use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, Nullifier, SecretHash};
use crate::denomination::Denomination;

/// Client-held record of a deposit. Never leaves the owner's machine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateNote {
    #[serde(with = "hex")]
    pub secret: [u8; 32],
    #[serde(with = "hex")]
    pub nullifier_secret: [u8; 32],
    pub secret_hash: SecretHash,
    pub nullifier: Nullifier,
    pub commitment: Commitment,
    pub amount: u64,
    /// Unix seconds.
    pub created_at: i64,
    pub spent: bool,
}

/// The public values a withdrawal reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalInputs {
    pub secret_hash: SecretHash,
    pub nullifier: Nullifier,
    pub commitment: Commitment,
    pub amount: u64,
}

impl PrivateNote {
    /// Draws fresh secrets from `rng` and derives the commitment.
    pub fn generate<R: RngCore + CryptoRng>(
        denomination: Denomination,
        created_at: i64,
        rng: &mut R,
    ) -> Self {
        let mut secret = [0u8; 32];
        let mut nullifier_secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        rng.fill_bytes(&mut nullifier_secret);
        Self::from_secrets(secret, nullifier_secret, denomination.lamports(), created_at)
    }

    pub fn from_secrets(
        secret: [u8; 32],
        nullifier_secret: [u8; 32],
        amount: u64,
        created_at: i64,
    ) -> Self {
        let secret_hash = SecretHash::from_secret(&secret);
        let nullifier = Nullifier::from_secret(&nullifier_secret);
        let commitment = Commitment::compute(&secret_hash, &nullifier, amount);
        Self {
            secret,
            nullifier_secret,
            secret_hash,
            nullifier,
            commitment,
            amount,
            created_at,
            spent: false,
        }
    }

    pub fn withdrawal_inputs(&self) -> WithdrawalInputs {
        WithdrawalInputs {
            secret_hash: self.secret_hash,
            nullifier: self.nullifier,
            commitment: self.commitment,
            amount: self.amount,
        }
    }

    /// Re-derives every hash from the stored secrets.
    pub fn verify(&self) -> bool {
        let recomputed =
            Self::from_secrets(self.secret, self.nullifier_secret, self.amount, self.created_at);
        recomputed.secret_hash == self.secret_hash
            && recomputed.nullifier == self.nullifier
            && recomputed.commitment == self.commitment
    }

    pub fn denomination(&self) -> Option<Denomination> {
        Denomination::from_lamports(self.amount)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for PrivateNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateNote")
            .field("commitment", &self.commitment)
            .field("amount", &self.amount)
            .field("created_at", &self.created_at)
            .field("spent", &self.spent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::collections::HashSet;

    #[test]
    fn test_generated_note_is_consistent() {
        let note = PrivateNote::generate(Denomination::HalfSol, 1_700_000_000, &mut OsRng);
        assert!(note.verify());
        assert!(!note.spent);
        assert_eq!(note.amount, 500_000_000);
        assert_eq!(note.denomination(), Some(Denomination::HalfSol));
        assert_ne!(note.secret, note.nullifier_secret);
    }

    #[test]
    fn test_tampered_note_fails_verify() {
        let mut note = PrivateNote::generate(Denomination::OneSol, 0, &mut OsRng);
        note.amount = 100_000_000;
        assert!(!note.verify());
    }

    #[test]
    fn test_no_collisions() {
        let mut commitments = HashSet::new();
        let mut nullifiers = HashSet::new();
        for _ in 0..10_000 {
            let note = PrivateNote::generate(Denomination::TenthSol, 0, &mut OsRng);
            assert!(commitments.insert(note.commitment));
            assert!(nullifiers.insert(note.nullifier));
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let note = PrivateNote::from_secrets([0xaa; 32], [0xbb; 32], 100_000_000, 0);
        let printed = format!("{:?}", note);
        assert!(!printed.contains("secret"));
        assert!(!printed.contains(&"aa".repeat(32)));
        assert!(!printed.contains(&"bb".repeat(32)));
    }
}
