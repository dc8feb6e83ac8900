//! Error handling utilities for the daybook application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Represents specific error cases that can occur during cryptographic
/// operations and key-store state transitions.
///
/// # Examples
///
/// ```
/// use daybook::errors::CryptoError;
///
/// let error = CryptoError::NotUnlocked;
/// assert!(format!("{}", error).contains("unlocked"));
/// ```
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Wrong passphrase supplied to an unlock or decryption attempt.
    ///
    /// The store stays locked; callers may retry.
    #[error("Incorrect passphrase")]
    InvalidPassphrase,

    /// An encrypt/decrypt operation was requested before the key store
    /// reached the unlocked state. This is a programming-contract violation,
    /// not a user error.
    #[error("Key store is not unlocked. Unlock it with the passphrase before encrypting or decrypting.")]
    NotUnlocked,

    /// The key store has no on-disk secrets yet; `initialize` must run first.
    #[error("Key store has not been initialized for this data directory")]
    NotInitialized,

    /// `initialize` was called on a key store that already has secrets.
    #[error("Key store is already initialized")]
    AlreadyInitialized,

    /// Error while producing ciphertext.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Ciphertext unreadable under the given key. Fatal to the affected
    /// file only, never to a whole directory scan.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The stored passphrase digest could not be parsed or produced.
    #[error("Malformed passphrase digest: {0}")]
    MalformedDigest(String),
}

/// Represents a failure to parse a whole calendar document.
///
/// Individual malformed records inside an otherwise readable document are
/// not errors in loose mode; they are collected as [`crate::codec::ParseIssue`]
/// values alongside the successfully parsed entries.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document is not recognizable calendar text at all.
    #[error("Unparseable calendar document: {0}")]
    Document(String),

    /// A record failed to parse while strict parsing was requested.
    #[error("Malformed record in strict mode: {0}")]
    StrictRecord(String),
}

/// Represents errors acquiring the data-directory lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock on this data directory.
    #[error("Data directory is in use by another process: {path}")]
    DirectoryBusy {
        /// The directory that is locked
        path: PathBuf,
    },

    /// Creating or locking the lock file failed for a technical reason.
    #[error("Failed to acquire lock for data directory {path}: {source}")]
    AcquisitionFailed {
        /// The directory that couldn't be locked
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Represents all possible errors that can occur in the daybook application.
///
/// This enum is the central error type used across the application, with
/// variants for different error categories. It uses `thiserror` for deriving
/// the `Error` trait implementation and formatted error messages.
///
/// # Examples
///
/// Converting from an IO error:
/// ```
/// use daybook::errors::AppError;
/// use std::io::{self, ErrorKind};
///
/// let io_error = io::Error::new(ErrorKind::NotFound, "file not found");
/// let app_error: AppError = io_error.into();
///
/// match app_error {
///     AppError::Io(inner) => assert_eq!(inner.kind(), ErrorKind::NotFound),
///     _ => panic!("Expected Io variant"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors in journal/repository logic (e.g. an entry with no filing date).
    #[error("Journal error: {0}")]
    Journal(String),

    /// Whole-document calendar parse failures.
    #[error("Calendar format error: {0}")]
    Codec(#[from] CodecError),

    /// Errors from encryption, decryption, or key management.
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Errors acquiring the data-directory lock.
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_app_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected AppError::Io variant"),
        }
    }

    #[test]
    fn test_app_error_display() {
        let config_error = AppError::Config("Invalid configuration".to_string());
        assert_eq!(
            format!("{}", config_error),
            "Configuration error: Invalid configuration"
        );

        let journal_error = AppError::Journal("Entry has no filing date".to_string());
        assert_eq!(
            format!("{}", journal_error),
            "Journal error: Entry has no filing date"
        );

        let crypto_error = AppError::Crypto(CryptoError::InvalidPassphrase);
        assert!(format!("{}", crypto_error).contains("Incorrect passphrase"));
    }

    #[test]
    fn test_crypto_error_variants() {
        assert!(format!("{}", CryptoError::NotUnlocked).contains("not unlocked"));
        assert!(format!("{}", CryptoError::AlreadyInitialized).contains("already initialized"));
        assert!(
            format!("{}", CryptoError::Decryption("bad header".into())).contains("bad header")
        );
    }

    #[test]
    fn test_lock_error_display() {
        let error = LockError::DirectoryBusy {
            path: PathBuf::from("/data/daybook"),
        };
        let app_error = AppError::Lock(error);
        assert!(format!("{}", app_error).contains("in use by another process"));
        assert!(format!("{}", app_error).contains("/data/daybook"));
    }
}
