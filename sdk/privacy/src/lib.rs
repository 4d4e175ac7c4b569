//! Murk Privacy SDK
//!
//! Client-side primitives for the commitment/nullifier privacy pool.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Private Note                             │
//! │                                                                  │
//! │   secret ──SHA256──> secret_hash ─┐                              │
//! │                                   ├─SHA256(.. || amount)──> C    │
//! │   nullifier_secret ──SHA256──> N ─┘                              │
//! │                                                                  │
//! │   deposit:  publish C                 (commitment record)        │
//! │   withdraw: reveal secret_hash, N     (nullifier record)         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Raw secrets never leave the [`NoteStore`]. Losing a note loses the
//! deposit: nothing on the ledger can reconstruct it.

pub mod commitment;
pub mod denomination;
pub mod encryption;
pub mod note;
pub mod store;

pub use commitment::{Commitment, Nullifier, SecretHash, sha256};
pub use denomination::{ALLOWED_AMOUNTS, DENOMINATION_VERSION, Denomination};
pub use encryption::{SealedBlob, derive_store_key, open_sealed, seal};
pub use note::{PrivateNote, WithdrawalInputs};
pub use store::{NoteStore, NoteStoreError};
