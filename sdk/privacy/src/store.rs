//! Private Note Store
//!
//! Per-owner set of [`PrivateNote`]s keyed by commitment. The whole set is
//! serialized to JSON and sealed with the owner's key before touching disk.
//! A store opened without a path lives in memory only.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::commitment::Commitment;
use crate::encryption::{SealedBlob, derive_store_key, open_sealed, seal};
use crate::note::PrivateNote;

#[derive(Debug, Error)]
pub enum NoteStoreError {
    #[error("note store io error: {0}")]
    Io(#[from] io::Error),
    #[error("note store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("note store could not be decrypted (wrong owner secret or corrupted file)")]
    Decryption,
    #[error("note store encryption failed")]
    Encryption,
    #[error("unsupported note store version {0}")]
    UnsupportedVersion(u8),
    #[error("note with commitment {0} already stored")]
    DuplicateNote(Commitment),
    #[error("no note with commitment {0}")]
    UnknownNote(Commitment),
}

pub struct NoteStore {
    path: Option<PathBuf>,
    key: [u8; 32],
    notes: BTreeMap<Commitment, PrivateNote>,
}

impl NoteStore {
    /// Opens (or creates) the store at `path`, sealed under `owner_secret`.
    pub fn open(path: impl AsRef<Path>, owner_secret: &[u8]) -> Result<Self, NoteStoreError> {
        let path = path.as_ref().to_path_buf();
        let key = derive_store_key(owner_secret);

        let notes = if path.exists() {
            let raw = fs::read(&path)?;
            let blob: SealedBlob = serde_json::from_slice(&raw)?;
            if blob.version != SealedBlob::VERSION {
                return Err(NoteStoreError::UnsupportedVersion(blob.version));
            }
            let plaintext = open_sealed(&key, &blob).ok_or(NoteStoreError::Decryption)?;
            let list: Vec<PrivateNote> = serde_json::from_slice(&plaintext)?;
            list.into_iter().map(|n| (n.commitment, n)).collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            key,
            notes,
        })
    }

    pub fn in_memory(owner_secret: &[u8]) -> Self {
        Self {
            path: None,
            key: derive_store_key(owner_secret),
            notes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, note: PrivateNote) -> Result<(), NoteStoreError> {
        if self.notes.contains_key(&note.commitment) {
            return Err(NoteStoreError::DuplicateNote(note.commitment));
        }
        let commitment = note.commitment;
        self.notes.insert(commitment, note);
        self.persist().inspect_err(|_| {
            self.notes.remove(&commitment);
        })
    }

    pub fn get(&self, commitment: &Commitment) -> Option<&PrivateNote> {
        self.notes.get(commitment)
    }

    pub fn mark_spent(&mut self, commitment: &Commitment) -> Result<(), NoteStoreError> {
        let note = self
            .notes
            .get_mut(commitment)
            .ok_or(NoteStoreError::UnknownNote(*commitment))?;
        if note.spent {
            return Ok(());
        }
        note.spent = true;
        self.persist().inspect_err(|_| {
            if let Some(note) = self.notes.get_mut(commitment) {
                note.spent = false;
            }
        })
    }

    /// Drops a note for good. Its deposit can no longer be withdrawn.
    pub fn remove(&mut self, commitment: &Commitment) -> Result<PrivateNote, NoteStoreError> {
        let note = self
            .notes
            .remove(commitment)
            .ok_or(NoteStoreError::UnknownNote(*commitment))?;
        if let Err(e) = self.persist() {
            self.notes.insert(*commitment, note);
            return Err(e);
        }
        Ok(note)
    }

    pub fn unspent(&self) -> impl Iterator<Item = &PrivateNote> {
        self.notes.values().filter(|n| !n.spent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrivateNote> {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn unspent_balance(&self) -> u64 {
        self.unspent().map(|n| n.amount).sum()
    }

    fn persist(&self) -> Result<(), NoteStoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let list: Vec<&PrivateNote> = self.notes.values().collect();
        let plaintext = serde_json::to_vec(&list)?;
        let blob = seal(&self.key, &plaintext).ok_or(NoteStoreError::Encryption)?;
        let encoded = serde_json::to_vec_pretty(&blob)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denomination::Denomination;
    use rand::rngs::OsRng;
    use tempfile::TempDir;

    fn note(d: Denomination) -> PrivateNote {
        PrivateNote::generate(d, 1_700_000_000, &mut OsRng)
    }

    #[test]
    fn test_reopen_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");

        let a = note(Denomination::TenthSol);
        let b = note(Denomination::OneSol);
        {
            let mut store = NoteStore::open(&path, b"owner").unwrap();
            store.insert(a.clone()).unwrap();
            store.insert(b.clone()).unwrap();
            store.mark_spent(&a.commitment).unwrap();
        }

        let store = NoteStore::open(&path, b"owner").unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(&a.commitment).unwrap().spent);
        assert_eq!(store.get(&b.commitment).unwrap(), &b);
        assert_eq!(store.unspent().count(), 1);
        assert_eq!(store.unspent_balance(), 1_000_000_000);
    }

    #[test]
    fn test_file_does_not_leak_secrets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        let n = note(Denomination::HalfSol);
        let mut store = NoteStore::open(&path, b"owner").unwrap();
        store.insert(n.clone()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains(&hex::encode(n.secret)));
        assert!(!raw.contains(&n.commitment.to_hex()));
    }

    #[test]
    fn test_wrong_owner_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        {
            let mut store = NoteStore::open(&path, b"owner").unwrap();
            store.insert(note(Denomination::TenthSol)).unwrap();
        }
        assert!(matches!(
            NoteStore::open(&path, b"intruder"),
            Err(NoteStoreError::Decryption)
        ));
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        let kept = note(Denomination::TenthSol);
        let mut store = NoteStore::open(&path, b"owner").unwrap();
        store.insert(kept.clone()).unwrap();

        // a directory in place of the file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let fresh = note(Denomination::HalfSol);
        assert!(matches!(store.insert(fresh.clone()), Err(NoteStoreError::Io(_))));
        assert!(store.get(&fresh.commitment).is_none());

        assert!(store.mark_spent(&kept.commitment).is_err());
        assert!(!store.get(&kept.commitment).unwrap().spent);

        assert!(store.remove(&kept.commitment).is_err());
        assert_eq!(store.get(&kept.commitment), Some(&kept));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_and_unknown() {
        let mut store = NoteStore::in_memory(b"owner");
        let n = note(Denomination::TenthSol);
        store.insert(n.clone()).unwrap();
        assert!(matches!(
            store.insert(n.clone()),
            Err(NoteStoreError::DuplicateNote(_))
        ));

        let removed = store.remove(&n.commitment).unwrap();
        assert_eq!(removed.commitment, n.commitment);
        assert!(store.is_empty());
        assert!(matches!(
            store.mark_spent(&n.commitment),
            Err(NoteStoreError::UnknownNote(_))
        ));
    }
}
