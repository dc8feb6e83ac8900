/*!
# Daybook

Daybook is a journal kept as per-date calendar files. Each entry lives in a
file named for its filing date (`20240315.ics`), optionally encrypted, and
the whole directory is indexed in memory for queries by year, month, and
category.

## Core Features

- One calendar file per filing date, with tolerant parsing of hand-edited
  or foreign files
- Optional encryption of entry files under a two-tier key scheme: a
  system-generated key encrypts the data, and only that key is re-wrapped
  when the user changes their passphrase
- Derived indices (dates, years, months, categories) rebuilt after every
  change
- Change notification for add/update/delete, in listener registration order

## Architecture

The codebase follows a modular architecture with clear separation of
concerns:

- `model`: the `Entry` data type and canonical file naming
- `codec`: calendar text parsing and generation
- `crypto`: passphrase encryption and digests (age + Argon2id)
- `keystore`: the two-tier passphrase/system-key scheme
- `repository`: file scanning, indexing, save/delete, change events
- `export`: bulk export to a single calendar file
- `config`: environment-driven configuration
- `cli`: command-line interface handling using clap
- `errors`: error handling infrastructure

## Usage Example

```no_run
use daybook::keystore::KeyStore;
use daybook::model::Entry;
use daybook::repository::{Repository, RepositoryOptions};
use chrono::NaiveDate;

fn main() -> daybook::AppResult<()> {
    let config = daybook::Config::load()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let mut keystore = KeyStore::open(&config.data_dir)?;
    if !keystore.is_initialized() {
        keystore.initialize()?;
    } else {
        keystore.unlock("my passphrase")?;
    }

    let mut repository =
        Repository::open(&config.data_dir, RepositoryOptions::default(), keystore)?;

    let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let mut entry = Entry::new(date, "A walk in the rain");
    repository.save(&mut entry)?;
    Ok(())
}
```
*/

/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Calendar text parsing and generation
pub mod codec;
/// Configuration loading and management
pub mod config;
/// Constants used throughout the application
pub mod constants;
/// Passphrase encryption and digest primitives
pub mod crypto;
/// Error types and utilities for error handling
pub mod errors;
/// Bulk export of entries to a single calendar file
pub mod export;
pub(crate) mod fsutil;
/// The two-tier passphrase/system-key scheme
pub mod keystore;
/// The entry data model
pub mod model;
/// Entry files, indexing, and change notification
pub mod repository;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use keystore::KeyStore;
pub use model::Entry;
pub use repository::{Repository, RepositoryEvent, RepositoryOptions};
