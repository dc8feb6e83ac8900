/*!
# Daybook - A Calendar-File Journal

Daybook keeps a personal journal as one calendar file per filing date,
optionally encrypted. This file contains the main application flow,
coordinating configuration, the key store, and the repository.

## Usage

```text
daybook [OPTIONS] <COMMAND>

Commands:
  list        List entries, optionally narrowed to a year or a month
  years       Print the years that have entries, newest first
  categories  Print every category in use
  add         Add a new entry
  delete      Delete the entry with the given uid
  export      Export entries to a single plaintext calendar file
  passwd      Change the passphrase protecting the data directory

Options:
  -d, --dir <DIR>  Data directory
      --strict     Fail a file's load on the first malformed record
      --encrypt    Create new entry files encrypted rather than plaintext
  -v, --verbose    Print verbose output
```

## Configuration

- `DAYBOOK_DIR`: The directory to store entry files (defaults to
  "~/Documents/daybook")
- `DAYBOOK_PASSPHRASE`: Passphrase for non-interactive use; otherwise the
  terminal prompts
*/

use std::env;
use std::fs;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use daybook::cli::{self, CliArgs, Command};
use daybook::config::Config;
use daybook::constants;
use daybook::errors::{AppError, AppResult, CryptoError};
use daybook::export;
use daybook::keystore::KeyStore;
use daybook::model::Entry;
use daybook::repository::{Repository, RepositoryOptions};

/// Passphrase prompt attempts before giving up.
const MAX_UNLOCK_ATTEMPTS: u32 = 3;

fn main() -> AppResult<()> {
    let args = CliArgs::parse();
    init_tracing(args.verbose);
    info!("starting daybook");

    let mut config = Config::load()?;
    if let Some(dir) = &args.dir {
        config.data_dir = if dir.is_absolute() {
            dir.clone()
        } else {
            env::current_dir()?.join(dir)
        };
    }
    debug!(data_dir = %config.data_dir.display(), "configuration loaded");
    fs::create_dir_all(&config.data_dir)?;

    let mut keystore = KeyStore::open(&config.data_dir)?;
    unlock(&mut keystore, &config)?;
    if keystore.is_default_passphrase() && !matches!(args.command, Command::Passwd) {
        eprintln!(
            "Note: this journal is protected by the default passphrase. \
             Run `daybook passwd` to set your own."
        );
    }

    let options = RepositoryOptions {
        strict_parsing: args.strict,
        encrypt_new_files: args.encrypt,
    };
    let mut repository = Repository::open(&config.data_dir, options, keystore)?;
    if repository.parse_error_count() > 0 {
        eprintln!(
            "Warning: {} record(s) could not be read; see the log for details.",
            repository.parse_error_count()
        );
    }

    run_command(args.command, &mut repository)
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "daybook=debug" } else { "daybook=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Unlock the key store: first run initializes it, stores that never left
/// the default passphrase unlock silently, everything else takes the
/// passphrase from the environment or the terminal.
fn unlock(keystore: &mut KeyStore, config: &Config) -> AppResult<()> {
    if !keystore.is_initialized() {
        keystore.initialize()?;
        return Ok(());
    }

    if keystore.unlock(constants::DEFAULT_PASSPHRASE).is_ok() {
        return Ok(());
    }

    if let Some(passphrase) = &config.passphrase {
        return keystore.unlock(passphrase);
    }

    let mut attempts = 0;
    loop {
        attempts += 1;
        let passphrase = rpassword::prompt_password("Passphrase: ")?;
        match keystore.unlock(&passphrase) {
            Ok(()) => return Ok(()),
            Err(AppError::Crypto(CryptoError::InvalidPassphrase))
                if attempts < MAX_UNLOCK_ATTEMPTS =>
            {
                eprintln!("Incorrect passphrase, try again.");
            }
            Err(e) => return Err(e),
        }
    }
}

fn run_command(command: Command, repository: &mut Repository) -> AppResult<()> {
    match command {
        Command::List { year, month } => {
            let entries = match (year, month) {
                (Some(year), Some(month)) => repository.entries_by_month(year, month),
                (Some(year), None) => repository.entries_by_year(year),
                _ => repository.all_entries(),
            };
            print_entries(&entries);
            Ok(())
        }

        Command::Years => {
            for year in repository.years() {
                println!("{}", year);
            }
            Ok(())
        }

        Command::Categories => {
            for category in repository.categories() {
                println!("{}", category);
            }
            Ok(())
        }

        Command::Add {
            date,
            summary,
            description,
            categories,
        } => {
            let date = match date {
                Some(raw) => cli::parse_date(&raw)
                    .map_err(|e| AppError::Journal(format!("Invalid date format: {}", e)))?,
                None => chrono::Local::now().date_naive(),
            };
            let mut entry = Entry::new(date, summary);
            entry.description = description;
            entry.categories = categories;
            repository.save(&mut entry)?;
            println!("Added {} ({})", entry.uid, entry.date);
            Ok(())
        }

        Command::Delete { uid } => {
            let entry = repository
                .find_by_uid(&uid)
                .ok_or_else(|| AppError::Journal(format!("No entry with uid {}", uid)))?;
            if repository.delete(&entry)? {
                println!("Deleted {}", uid);
            }
            Ok(())
        }

        Command::Export { output, year } => {
            let entries = match year {
                Some(year) => repository.entries_by_year(year),
                None => repository.all_entries(),
            };
            let written = export::export_entries(&output, &entries)?;
            println!("Exported {} entries to {}", entries.len(), written.display());
            Ok(())
        }

        Command::Passwd => {
            let new_passphrase = rpassword::prompt_password("New passphrase: ")?;
            if new_passphrase.trim().is_empty() {
                return Err(AppError::Journal("Passphrase cannot be empty".to_string()));
            }
            let confirmation = rpassword::prompt_password("Repeat passphrase: ")?;
            if new_passphrase != confirmation {
                return Err(AppError::Journal("Passphrases do not match".to_string()));
            }
            repository.keystore_mut().change_passphrase(&new_passphrase)?;
            println!("Passphrase changed.");
            Ok(())
        }
    }
}

fn print_entries(entries: &[Entry]) {
    for entry in entries {
        let categories = if entry.categories.is_empty() {
            String::new()
        } else {
            format!("  [{}]", entry.categories.join(", "))
        };
        println!("{}  {}  {}{}", entry.date, entry.uid, entry.summary, categories);
    }
}
