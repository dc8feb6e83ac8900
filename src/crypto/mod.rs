//! Cryptographic primitives for the key store and encrypted entry files.
//!
//! Two independent services, both pure functions with no side effects:
//!
//! - passphrase-based encryption and decryption of opaque byte blobs using
//!   the age format (scrypt KDF);
//! - salted, computationally hardened one-way passphrase digests using
//!   Argon2id, stored in PHC string format.
//!
//! Nothing in this module knows about files or the two-tier key scheme;
//! that lives in [`crate::keystore`].

use std::io::{Read, Write};
use std::iter;

use age::secrecy::SecretString;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::{AppResult, CryptoError};

/// Encrypt a blob under a passphrase.
///
/// The ciphertext is an opaque age blob with no additional framing.
///
/// # Examples
///
/// ```
/// use daybook::crypto::{encrypt, decrypt};
///
/// let ciphertext = encrypt(b"dear diary", "a passphrase").unwrap();
/// assert_ne!(ciphertext.as_slice(), b"dear diary");
/// let plaintext = decrypt(&ciphertext, "a passphrase").unwrap();
/// assert_eq!(plaintext, b"dear diary");
/// ```
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> AppResult<Vec<u8>> {
    let encryptor =
        age::Encryptor::with_user_passphrase(SecretString::from(passphrase.to_string()));

    let mut ciphertext = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut ciphertext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    writer
        .write_all(plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(ciphertext)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// # Errors
///
/// [`CryptoError::InvalidPassphrase`] when the passphrase does not match,
/// [`CryptoError::Decryption`] when the blob is corrupt or not an age blob.
pub fn decrypt(ciphertext: &[u8], passphrase: &str) -> AppResult<Vec<u8>> {
    let decryptor = age::Decryptor::new(ciphertext)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;

    let identity = age::scrypt::Identity::new(SecretString::from(passphrase.to_string()));
    let mut reader = decryptor
        .decrypt(iter::once(&identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys
            | age::DecryptError::DecryptionFailed
            | age::DecryptError::KeyDecryptionFailed => CryptoError::InvalidPassphrase,
            _ => CryptoError::Decryption(e.to_string()),
        })?;

    let mut plaintext = Vec::new();
    reader
        .read_to_end(&mut plaintext)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;

    Ok(plaintext)
}

/// Produce a salted Argon2id digest of a passphrase, in PHC string format.
///
/// The digest is one-way; there is no way to recover a lost passphrase
/// from it.
pub fn hash_passphrase(passphrase: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| CryptoError::MalformedDigest(e.to_string()))?;
    Ok(digest.to_string())
}

/// Check a passphrase against a digest produced by [`hash_passphrase`].
///
/// A mismatched passphrase is `Ok(false)`; only an unreadable digest is an
/// error.
pub fn verify_passphrase(passphrase: &str, digest: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(digest).map_err(|e| CryptoError::MalformedDigest(e.to_string()))?;
    match Argon2::default().verify_password(passphrase.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::MalformedDigest(e.to_string()).into()),
    }
}
