//! Note Store Encryption
//!
//! The note store is sealed at rest with ChaCha20-Poly1305.
//!
//! ```text
//! Flow:
//! 1. key        = HKDF-SHA256(salt = "murk-note-store", ikm = owner_secret, info = "murk-notes-v1")
//! 2. nonce      = 12 random bytes, fresh per write
//! 3. ciphertext = ChaCha20-Poly1305(key, nonce, plaintext)
//! 4. Output     = (version, nonce, ciphertext || tag)
//! ```

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const STORE_SALT: &[u8] = b"murk-note-store";
const STORE_INFO: &[u8] = b"murk-notes-v1";

/// On-disk envelope of an encrypted note store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedBlob {
    pub version: u8,
    #[serde(with = "hex")]
    pub nonce: [u8; 12],
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
}

impl SealedBlob {
    pub const VERSION: u8 = 1;
}

/// Derives the 32-byte store key from the owner's secret.
pub fn derive_store_key(owner_secret: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(STORE_SALT), owner_secret);
    let mut okm = [0u8; 32];
    // 32 bytes is always a valid HKDF-SHA256 output length
    let _ = hk.expand(STORE_INFO, &mut okm);
    okm
}

/// Encrypts `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Option<SealedBlob> {
    let mut nonce_bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(key).ok()?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .ok()?;

    Some(SealedBlob {
        version: SealedBlob::VERSION,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts a blob. `None` on a wrong key or any tampering.
pub fn open_sealed(key: &[u8; 32], blob: &SealedBlob) -> Option<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).ok()?;
    cipher
        .decrypt(Nonce::from_slice(&blob.nonce), blob.ciphertext.as_slice())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = derive_store_key(b"owner secret");
        let blob = seal(&key, b"hello notes").expect("seal");
        assert_eq!(blob.ciphertext.len(), b"hello notes".len() + 16);
        assert_eq!(open_sealed(&key, &blob).as_deref(), Some(&b"hello notes"[..]));
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = derive_store_key(b"owner secret");
        let wrong = derive_store_key(b"someone else");
        let blob = seal(&key, b"hello notes").expect("seal");
        assert!(open_sealed(&wrong, &blob).is_none());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = derive_store_key(b"owner secret");
        let mut blob = seal(&key, b"hello notes").expect("seal");
        blob.ciphertext[0] ^= 0x01;
        assert!(open_sealed(&key, &blob).is_none());
    }

    #[test]
    fn test_nonce_is_fresh() {
        let key = derive_store_key(b"owner secret");
        let a = seal(&key, b"same").expect("seal");
        let b = seal(&key, b"same").expect("seal");
        assert_ne!(a.nonce, b.nonce);
    }
}
