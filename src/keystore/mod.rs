//! The two-tier passphrase/system-key scheme.
//!
//! All entry files are encrypted under a system-generated key, and that key
//! is itself stored encrypted under the user's chosen passphrase. Changing
//! the passphrase therefore only re-wraps the system key; no data file is
//! ever re-encrypted.
//!
//! Two fixed-name files live in the data directory:
//!
//! - `userpassword.dat` — an Argon2id digest of the user passphrase. The
//!   passphrase itself is never stored, so a lost passphrase is
//!   unrecoverable.
//! - `security.dat` — the system key, age-encrypted under the passphrase.
//!
//! A [`KeyStore`] moves `Uninitialized -> Locked -> Unlocked`. It is an
//! explicitly constructed value owned by the repository; there is no
//! process-wide instance.

use std::fs;
use std::path::{Path, PathBuf};

use age::secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::constants;
use crate::crypto;
use crate::errors::{AppResult, CryptoError};
use crate::fsutil;

enum State {
    /// No stored secrets yet; `initialize` must run.
    Uninitialized,
    /// Secrets exist on disk but no passphrase has been verified.
    Locked,
    /// Passphrase verified; system key held in memory.
    Unlocked {
        passphrase: SecretString,
        system_key: SecretString,
    },
}

/// Manages the passphrase digest and the encrypted system key for one data
/// directory.
///
/// # Examples
///
/// ```no_run
/// use daybook::keystore::KeyStore;
/// use std::path::Path;
///
/// let mut keystore = KeyStore::open(Path::new("/home/me/Documents/daybook"))?;
/// if !keystore.is_initialized() {
///     keystore.initialize()?;
/// } else {
///     keystore.unlock("my passphrase")?;
/// }
/// let ciphertext = keystore.encrypt_text("dear diary")?;
/// assert_eq!(keystore.decrypt_text(&ciphertext)?, "dear diary");
/// # Ok::<(), daybook::errors::AppError>(())
/// ```
pub struct KeyStore {
    digest_path: PathBuf,
    key_path: PathBuf,
    state: State,
}

impl KeyStore {
    /// Inspect the data directory and construct a store in the
    /// `Uninitialized` or `Locked` state. Never prompts and never writes.
    ///
    /// Presence of the system-key file is the initialization marker, as in
    /// the original data-directory layout.
    pub fn open(base_directory: &Path) -> AppResult<KeyStore> {
        let key_path = base_directory.join(constants::SYSTEM_KEY_FILE_NAME);
        let digest_path = base_directory.join(constants::PASSPHRASE_DIGEST_FILE_NAME);
        let state = if key_path.exists() {
            State::Locked
        } else {
            State::Uninitialized
        };
        Ok(KeyStore {
            digest_path,
            key_path,
            state,
        })
    }

    /// Whether secrets exist for this data directory (on disk or in memory).
    pub fn is_initialized(&self) -> bool {
        !matches!(self.state, State::Uninitialized)
    }

    /// Whether the system key is available in memory.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, State::Unlocked { .. })
    }

    /// First-run setup: generate a fresh system key, wrap it under the
    /// default sentinel passphrase, and persist both fixed-name files.
    /// Leaves the store unlocked.
    ///
    /// # Errors
    ///
    /// [`CryptoError::AlreadyInitialized`] when secrets already exist;
    /// I/O errors from persisting either file.
    pub fn initialize(&mut self) -> AppResult<()> {
        if self.is_initialized() {
            return Err(CryptoError::AlreadyInitialized.into());
        }

        let passphrase = constants::DEFAULT_PASSPHRASE;
        let digest = crypto::hash_passphrase(passphrase)?;
        fsutil::write_atomic(&self.digest_path, format!("{}\n", digest).as_bytes())?;

        // UUID-grade entropy; this value never changes for the lifetime of
        // the data directory.
        let system_key = Uuid::new_v4().to_string();
        let wrapped = crypto::encrypt(system_key.as_bytes(), passphrase)?;
        fsutil::write_atomic(&self.key_path, &wrapped)?;

        info!("initialized key store with default passphrase");
        self.state = State::Unlocked {
            passphrase: SecretString::from(passphrase.to_string()),
            system_key: SecretString::from(system_key),
        };
        Ok(())
    }

    /// Verify a candidate passphrase and, on success, decrypt the system
    /// key into memory.
    ///
    /// On failure the store stays locked and the caller may retry; there is
    /// no lockout or backoff.
    pub fn unlock(&mut self, candidate: &str) -> AppResult<()> {
        match self.state {
            State::Uninitialized => return Err(CryptoError::NotInitialized.into()),
            State::Unlocked { .. } => return Ok(()),
            State::Locked => {}
        }

        let stored = fs::read_to_string(&self.digest_path)?;
        let digest = stored.trim();
        if digest.is_empty() {
            return Err(CryptoError::MalformedDigest("empty digest file".to_string()).into());
        }
        if !crypto::verify_passphrase(candidate, digest)? {
            debug!("passphrase verification failed");
            return Err(CryptoError::InvalidPassphrase.into());
        }

        let wrapped = fs::read(&self.key_path)?;
        let key_bytes = Zeroizing::new(crypto::decrypt(&wrapped, candidate)?);
        let system_key = std::str::from_utf8(&key_bytes)
            .map_err(|_| CryptoError::Decryption("system key is not UTF-8".to_string()))?
            .to_string();

        debug!("key store unlocked");
        self.state = State::Unlocked {
            passphrase: SecretString::from(candidate.to_string()),
            system_key: SecretString::from(system_key),
        };
        Ok(())
    }

    /// Re-wrap the unchanged system key under a new passphrase and rewrite
    /// the digest. Previously encrypted data files stay readable because
    /// the system key itself never changes.
    ///
    /// In-memory state is only updated after both files persist; on failure
    /// the store is observably unchanged.
    pub fn change_passphrase(&mut self, new_passphrase: &str) -> AppResult<()> {
        let system_key = match &self.state {
            State::Unlocked { system_key, .. } => system_key.expose_secret().to_string(),
            _ => return Err(CryptoError::NotUnlocked.into()),
        };
        let system_key = Zeroizing::new(system_key);

        let digest = crypto::hash_passphrase(new_passphrase)?;
        fsutil::write_atomic(&self.digest_path, format!("{}\n", digest).as_bytes())?;

        let wrapped = crypto::encrypt(system_key.as_bytes(), new_passphrase)?;
        fsutil::write_atomic(&self.key_path, &wrapped)?;

        info!("passphrase changed");
        self.state = State::Unlocked {
            passphrase: SecretString::from(new_passphrase.to_string()),
            system_key: SecretString::from(system_key.to_string()),
        };
        Ok(())
    }

    /// Whether the user is still on the default sentinel passphrase.
    ///
    /// Used for a one-time advisory message only; this is not a security
    /// boundary.
    pub fn is_default_passphrase(&self) -> bool {
        match &self.state {
            State::Unlocked { passphrase, .. } => {
                passphrase.expose_secret() == constants::DEFAULT_PASSPHRASE
            }
            _ => false,
        }
    }

    /// Encrypt text under the in-memory system key.
    pub fn encrypt_text(&self, plaintext: &str) -> AppResult<Vec<u8>> {
        let system_key = self.system_key()?;
        crypto::encrypt(plaintext.as_bytes(), system_key.expose_secret())
    }

    /// Decrypt a blob produced by [`KeyStore::encrypt_text`].
    pub fn decrypt_text(&self, ciphertext: &[u8]) -> AppResult<String> {
        let system_key = self.system_key()?;
        let plaintext = Zeroizing::new(crypto::decrypt(
            ciphertext,
            system_key.expose_secret(),
        )?);
        std::str::from_utf8(&plaintext)
            .map(str::to_string)
            .map_err(|_| CryptoError::Decryption("plaintext is not UTF-8".to_string()).into())
    }

    fn system_key(&self) -> AppResult<&SecretString> {
        match &self.state {
            State::Unlocked { system_key, .. } => Ok(system_key),
            _ => Err(CryptoError::NotUnlocked.into()),
        }
    }
}
