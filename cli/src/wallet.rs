//! Local keystore under `~/.murk/` (or `$MURK_HOME`).
//!
//! ```text
//! ~/.murk/
//!   id.json         ed25519 seed, JSON byte array, 0600
//!   authority.json  pool authority seed, operator commands only
//!   notes.sealed    encrypted private notes, sealed under the id seed
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use murk_account::AccountId;
use murk_keypair::{Keypair, StealthKeyProvider};
use murk_privacy::NoteStore;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const HOME_DIR_NAME: &str = ".murk";
const ID_FILE: &str = "id.json";
const AUTHORITY_FILE: &str = "authority.json";
const NOTES_FILE: &str = "notes.sealed";

pub struct Wallet {
    dir: PathBuf,
}

impl Wallet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$MURK_HOME`, else `~/.murk`.
    pub fn from_env() -> Result<Self> {
        if let Ok(dir) = std::env::var("MURK_HOME") {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
        Ok(Self::new(home.join(HOME_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the wallet directory with 0700 permissions.
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            println!("📁 Created directory: {}", self.dir.display());

            #[cfg(unix)]
            {
                let mut perms = fs::metadata(&self.dir)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(&self.dir, perms)?;
            }
        }
        Ok(())
    }

    pub fn key_path(&self, filename: Option<&str>) -> PathBuf {
        self.dir.join(filename.unwrap_or(ID_FILE))
    }

    pub fn generate_key(&self, filename: Option<&str>) -> Result<(PathBuf, Keypair)> {
        self.ensure_dir()?;
        let path = self.key_path(filename);
        if path.exists() {
            return Err(anyhow!(
                "File {} already exists. Remove it first or use a different filename.",
                path.display()
            ));
        }
        let key = Keypair::new_random();
        key.write_to_file(&path)?;
        Ok((path, key))
    }

    pub fn identity(&self) -> Result<Keypair> {
        let path = self.key_path(None);
        Keypair::from_file(&path).with_context(|| {
            format!(
                "failed to load keypair from {} (run `murk genkey` first)",
                path.display()
            )
        })
    }

    /// Pool authority key, signs operator calls.
    pub fn authority(&self) -> Result<Keypair> {
        let path = self.key_path(Some(AUTHORITY_FILE));
        Keypair::from_file(&path).with_context(|| {
            format!(
                "failed to load authority keypair from {} (run `murk genkey {}`)",
                path.display(),
                AUTHORITY_FILE
            )
        })
    }

    /// One-shot recipient key `index`, derived from the identity seed.
    pub fn stealth(&self, index: u32) -> Result<Keypair> {
        Ok(StealthKeyProvider::from_keypair(&self.identity()?).derive(index))
    }

    pub fn notes(&self) -> Result<NoteStore> {
        let id = self.identity()?;
        let store = NoteStore::open(self.dir.join(NOTES_FILE), &id.to_seed())
            .context("failed to open note store")?;
        Ok(store)
    }
}

/// Parses a stealth index argument.
pub fn parse_index(s: &str) -> Result<u32> {
    s.parse()
        .map_err(|_| anyhow!("stealth index must be a non-negative integer, got {:?}", s))
}

pub fn short(id: &AccountId) -> String {
    let s = id.to_bs58();
    if s.len() > 12 {
        format!("{}…{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murk_privacy::{Denomination, PrivateNote};
    use tempfile::TempDir;

    #[test]
    fn test_generate_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let wallet = Wallet::new(dir.path().join("w"));
        let (path, key) = wallet.generate_key(None).unwrap();
        assert!(path.ends_with(ID_FILE));
        assert_eq!(wallet.identity().unwrap().account_id(), key.account_id());
        assert!(wallet.generate_key(None).is_err());
    }

    #[test]
    fn test_stealth_keys_follow_identity() {
        let dir = TempDir::new().unwrap();
        let wallet = Wallet::new(dir.path());
        wallet.generate_key(None).unwrap();
        let a = wallet.stealth(0).unwrap().account_id();
        assert_eq!(a, wallet.stealth(0).unwrap().account_id());
        assert_ne!(a, wallet.stealth(1).unwrap().account_id());
        assert_ne!(a, wallet.identity().unwrap().account_id());
    }

    #[test]
    fn test_notes_persist_in_wallet() {
        let dir = TempDir::new().unwrap();
        let wallet = Wallet::new(dir.path());
        wallet.generate_key(None).unwrap();
        let note = PrivateNote::generate(Denomination::TenthSol, 0, &mut rand::rngs::OsRng);
        wallet.notes().unwrap().insert(note.clone()).unwrap();

        let reopened = wallet.notes().unwrap();
        assert_eq!(reopened.get(&note.commitment), Some(&note));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("7").unwrap(), 7);
        assert!(parse_index("-1").is_err());
        assert!(parse_index("x").is_err());
    }
}
