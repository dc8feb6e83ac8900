//! Configuration management for the daybook application.
//!
//! This module handles loading and validating configuration settings from
//! environment variables, with sensible defaults.
//!
//! # Environment Variables
//!
//! - `DAYBOOK_DIR`: Path to the data directory (defaults to
//!   ~/Documents/daybook); tilde expansion is applied.
//! - `DAYBOOK_PASSPHRASE`: Optional non-interactive passphrase, used by
//!   scripts and tests instead of the terminal prompt.
//! - `HOME`: Used for expanding the default data directory path.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::constants;
use crate::errors::{AppError, AppResult};

/// Configuration for the daybook application.
///
/// # Examples
///
/// Loading configuration from environment variables:
/// ```no_run
/// use daybook::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("data directory: {}", config.data_dir.display());
/// ```
pub struct Config {
    /// Directory holding the entry files and the key-store files.
    ///
    /// Loaded from `DAYBOOK_DIR` with a fallback to `~/Documents/daybook`.
    pub data_dir: PathBuf,

    /// Passphrase supplied through the environment, if any.
    ///
    /// When absent the binary prompts on the terminal instead. Never
    /// logged; the Debug impl redacts it.
    pub passphrase: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &self.data_dir)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when no data directory can be determined
    /// (`DAYBOOK_DIR` unset and no home directory) or when the configured
    /// path is not absolute after expansion.
    pub fn load() -> AppResult<Config> {
        let raw_dir = match env::var(constants::ENV_VAR_DAYBOOK_DIR) {
            Ok(dir) if !dir.is_empty() => dir,
            _ => format!("~/{}", constants::DEFAULT_DATA_SUBDIR),
        };
        let expanded = shellexpand::tilde(&raw_dir);
        let data_dir = PathBuf::from(expanded.as_ref());
        if !data_dir.is_absolute() {
            return Err(AppError::Config(format!(
                "Data directory path must be absolute: {}",
                data_dir.display()
            )));
        }

        let passphrase = env::var(constants::ENV_VAR_DAYBOOK_PASSPHRASE)
            .ok()
            .filter(|p| !p.is_empty());

        Ok(Config {
            data_dir,
            passphrase,
        })
    }
}
