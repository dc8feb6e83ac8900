//! The entry repository: scanning, indexing, saving, deleting, notifying.
//!
//! A [`Repository`] owns the collection of [`EntryFile`]s found in one data
//! directory, the unlocked [`KeyStore`] used to read and write encrypted
//! files, and a set of derived indices (dates, years, months, categories)
//! that are rebuilt from scratch after every mutation. Rebuild-from-scratch
//! is a deliberate simplicity-over-performance choice at personal-journal
//! scale.
//!
//! All operations are synchronous, blocking I/O on the caller's thread.
//! Cross-process interleaving is kept out with an exclusive advisory lock
//! on the data directory; in-process access is single-threaded by design.

pub mod entry_file;
#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Utc};
use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::constants;
use crate::errors::{AppError, AppResult, CryptoError, LockError};
use crate::keystore::KeyStore;
use crate::model::{self, Entry};
pub use entry_file::EntryFile;

/// Behavior switches for [`Repository::open`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryOptions {
    /// Fail a file's load on the first malformed record instead of
    /// skipping and logging it.
    pub strict_parsing: bool,
    /// Create new entry files encrypted (`.ics.enc`) instead of plaintext.
    pub encrypt_new_files: bool,
}

/// A change applied to the repository, delivered to subscribers.
#[derive(Debug, Clone)]
pub enum RepositoryEvent {
    /// A new entry was persisted for the first time.
    Added(Entry),
    /// A previously persisted entry was rewritten.
    Updated(Entry),
    /// An entry was removed from its backing file.
    Deleted(Entry),
}

/// A file the directory scan could not load; the scan itself continues.
#[derive(Debug)]
pub struct ScanIssue {
    /// The file that failed.
    pub path: PathBuf,
    /// Why it failed.
    pub message: String,
}

type Listener = Box<dyn FnMut(&RepositoryEvent)>;

/// Derived views over all loaded entries, rebuilt after every mutation.
#[derive(Debug, Default)]
struct Index {
    /// Distinct filing dates, ascending.
    dates: Vec<NaiveDate>,
    /// Distinct years, descending.
    years: Vec<i32>,
    /// Distinct months per year, ascending.
    months_by_year: BTreeMap<i32, Vec<u32>>,
    /// Categories deduplicated case-insensitively, first-seen casing kept.
    categories: Vec<String>,
}

/// The collection of entry files in one data directory.
pub struct Repository {
    directory: PathBuf,
    options: RepositoryOptions,
    keystore: KeyStore,
    /// Keyed by canonical file name; BTreeMap so iteration follows date
    /// order and queries stay deterministic.
    files: BTreeMap<String, EntryFile>,
    index: Index,
    scan_issues: Vec<ScanIssue>,
    listeners: Vec<Listener>,
    /// Released when the repository is dropped.
    _lock: DirectoryLock,
}

impl Repository {
    /// Scan `directory` and build a repository over every readable entry
    /// file in it.
    ///
    /// The key store must already be unlocked: encrypted files are
    /// decrypted during the scan, and new writes may need to encrypt.
    /// Per-file load failures (I/O, decryption, unparseable documents)
    /// contribute zero entries plus a [`ScanIssue`] and never abort the
    /// scan. The directory is created if missing and locked for the
    /// lifetime of the repository.
    pub fn open(
        directory: &Path,
        options: RepositoryOptions,
        keystore: KeyStore,
    ) -> AppResult<Repository> {
        if !keystore.is_unlocked() {
            return Err(CryptoError::NotUnlocked.into());
        }
        fs::create_dir_all(directory)?;
        let lock = DirectoryLock::acquire(directory)?;

        let mut repository = Repository {
            directory: directory.to_path_buf(),
            options,
            keystore,
            files: BTreeMap::new(),
            index: Index::default(),
            scan_issues: Vec::new(),
            listeners: Vec::new(),
            _lock: lock,
        };
        repository.scan()?;
        repository.rebuild_index();
        info!(
            directory = %directory.display(),
            files = repository.files.len(),
            entries = repository.entry_count(),
            parse_errors = repository.parse_error_count(),
            "opened repository"
        );
        Ok(repository)
    }

    fn scan(&mut self) -> AppResult<()> {
        let mut names: Vec<String> = fs::read_dir(&self.directory)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        for name in names {
            let lower = name.to_lowercase();
            let encrypted = lower.ends_with(constants::ENCRYPTED_FILE_SUFFIX);
            let is_entry_file = if encrypted {
                lower
                    .strip_suffix(constants::ENCRYPTED_FILE_SUFFIX)
                    .is_some_and(|stem| stem.ends_with(constants::ENTRY_FILE_EXTENSION))
            } else {
                lower.ends_with(constants::ENTRY_FILE_EXTENSION)
            };
            if !is_entry_file {
                continue;
            }

            let path = self.directory.join(&name);
            let key = entry_file::canonical_name_of(&path);
            if self.files.contains_key(&key) {
                warn!(path = %path.display(), "duplicate canonical name, keeping first-scanned file");
                self.scan_issues.push(ScanIssue {
                    path,
                    message: format!("duplicate canonical name {}", key),
                });
                continue;
            }

            match EntryFile::load(&path, encrypted, &self.keystore, self.options.strict_parsing)
            {
                Ok(file) => {
                    self.files.insert(key, file);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    self.scan_issues.push(ScanIssue {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Persist an entry, filing it by the one-file-per-date convention.
    ///
    /// Whether this is an add or an update is decided by whether the entry
    /// had a backing file *before* this call began, not by content. Updates
    /// bump the sequence number by exactly one; both paths stamp
    /// `last_modified`, rewrite the backing file, rebuild the index, and
    /// fire exactly one event.
    ///
    /// On a write failure the repository rolls back to its pre-call state
    /// and the caller's entry is left untouched.
    pub fn save(&mut self, entry: &mut Entry) -> AppResult<()> {
        let added = entry.file_name.is_none();
        let key = match &entry.file_name {
            Some(key) => key.clone(),
            None => model::canonical_file_name(entry.date),
        };

        let mut created_file = false;
        if !self.files.contains_key(&key) {
            if !added {
                // A back-reference pointing at a file the scan never saw.
                return Err(AppError::Journal(format!(
                    "entry {} references unknown file {}",
                    entry.uid, key
                )));
            }
            created_file = true;
            let disk_name = if self.options.encrypt_new_files {
                format!("{}{}", key, constants::ENCRYPTED_FILE_SUFFIX)
            } else {
                key.clone()
            };
            let path = self.directory.join(disk_name);
            self.files
                .insert(key.clone(), EntryFile::create(&path, self.options.encrypt_new_files));
        }

        let mut stored = entry.clone();
        if !added {
            stored.sequence += 1;
        }
        stored.last_modified = Some(Utc::now());
        stored.file_name = Some(key.clone());

        let Some(file) = self.files.get_mut(&key) else {
            return Err(AppError::Journal(format!("missing entry file {}", key)));
        };
        let snapshot = file.entries_snapshot();
        file.upsert_entry(stored.clone());
        let write_result = file.write(&self.keystore);

        match write_result {
            Ok(()) => {
                *entry = stored;
                self.rebuild_index();
                let event = if added {
                    RepositoryEvent::Added(entry.clone())
                } else {
                    RepositoryEvent::Updated(entry.clone())
                };
                self.notify(&event);
                Ok(())
            }
            Err(e) => {
                if created_file {
                    self.files.remove(&key);
                } else if let Some(file) = self.files.get_mut(&key) {
                    file.restore_entries(snapshot);
                }
                Err(e)
            }
        }
    }

    /// Remove an entry from its backing file and rewrite the file, which
    /// persists as an empty container when its last entry goes.
    ///
    /// Returns `Ok(false)` without error or events when the entry has no
    /// backing file.
    pub fn delete(&mut self, entry: &Entry) -> AppResult<bool> {
        let Some(key) = entry.file_name.clone() else {
            debug!(uid = %entry.uid, "delete of unbacked entry ignored");
            return Ok(false);
        };
        let Some(file) = self.files.get_mut(&key) else {
            warn!(uid = %entry.uid, file = %key, "delete references unknown file");
            return Ok(false);
        };

        let snapshot = file.entries_snapshot();
        if !file.remove_entry(&entry.uid) {
            return Ok(false);
        }
        match file.write(&self.keystore) {
            Ok(()) => {
                self.rebuild_index();
                self.notify(&RepositoryEvent::Deleted(entry.clone()));
                Ok(true)
            }
            Err(e) => {
                if let Some(file) = self.files.get_mut(&key) {
                    file.restore_entries(snapshot);
                }
                Err(e)
            }
        }
    }

    /// Register a change listener. Listeners are called in registration
    /// order after every successful save or delete; there is no
    /// unregistration.
    pub fn subscribe(&mut self, listener: impl FnMut(&RepositoryEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: &RepositoryEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// Rebuild the derived indices from the current file set. Idempotent
    /// and total; runs automatically after every mutation.
    pub fn rebuild_index(&mut self) {
        let mut dates = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut months: BTreeMap<i32, BTreeSet<u32>> = BTreeMap::new();
        let mut categories = Vec::new();
        let mut seen_categories = HashSet::new();

        for file in self.files.values() {
            for entry in file.entries() {
                dates.insert(entry.date);
                years.insert(entry.date.year());
                months
                    .entry(entry.date.year())
                    .or_default()
                    .insert(entry.date.month());
                for category in &entry.categories {
                    let trimmed = category.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if seen_categories.insert(trimmed.to_uppercase()) {
                        categories.push(trimmed.to_string());
                    }
                }
            }
        }

        self.index = Index {
            dates: dates.into_iter().collect(),
            years: years.into_iter().rev().collect(),
            months_by_year: months
                .into_iter()
                .map(|(year, set)| (year, set.into_iter().collect()))
                .collect(),
            categories,
        };
    }

    /// All entries across all files, in file-name (date) order.
    pub fn all_entries(&self) -> Vec<Entry> {
        self.files
            .values()
            .flat_map(|f| f.entries().iter().cloned())
            .collect()
    }

    /// Entries whose filing date falls in the given year.
    pub fn entries_by_year(&self, year: i32) -> Vec<Entry> {
        self.files
            .values()
            .flat_map(|f| f.entries().iter())
            .filter(|e| e.date.year() == year)
            .cloned()
            .collect()
    }

    /// Entries whose filing date falls in the given year and month
    /// (January = 1).
    pub fn entries_by_month(&self, year: i32, month: u32) -> Vec<Entry> {
        self.files
            .values()
            .flat_map(|f| f.entries().iter())
            .filter(|e| e.date.year() == year && e.date.month() == month)
            .cloned()
            .collect()
    }

    /// Distinct years with entries, descending. Empty when there are none.
    pub fn years(&self) -> Vec<i32> {
        self.index.years.clone()
    }

    /// Distinct months with entries in the given year, ascending.
    pub fn months_for_year(&self, year: i32) -> Vec<u32> {
        self.index
            .months_by_year
            .get(&year)
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct filing dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.index.dates.clone()
    }

    /// Categories across all entries, deduplicated case-insensitively with
    /// the first-seen casing preserved.
    pub fn categories(&self) -> Vec<String> {
        self.index.categories.clone()
    }

    /// Look an entry up by its uid.
    pub fn find_by_uid(&self, uid: &str) -> Option<Entry> {
        self.files
            .values()
            .flat_map(|f| f.entries().iter())
            .find(|e| e.uid == uid)
            .cloned()
    }

    /// Total number of loaded entries.
    pub fn entry_count(&self) -> usize {
        self.files.values().map(|f| f.entry_count()).sum()
    }

    /// Skipped records plus files that failed to load wholesale.
    pub fn parse_error_count(&self) -> usize {
        let record_issues: usize = self.files.values().map(|f| f.issues().len()).sum();
        record_issues + self.scan_issues.len()
    }

    /// Files the scan could not load.
    pub fn scan_issues(&self) -> &[ScanIssue] {
        &self.scan_issues
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    pub fn keystore_mut(&mut self) -> &mut KeyStore {
        &mut self.keystore
    }
}

/// Exclusive advisory lock on a data directory, held for the lifetime of
/// the repository. A second process opening the same directory gets
/// [`LockError::DirectoryBusy`] instead of silently interleaving writes.
struct DirectoryLock {
    _file: fs::File,
}

impl DirectoryLock {
    fn acquire(directory: &Path) -> Result<DirectoryLock, LockError> {
        let lock_path = directory.join(constants::LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|source| LockError::AcquisitionFailed {
                path: directory.to_path_buf(),
                source,
            })?;
        file.try_lock_exclusive().map_err(|source| {
            if source.kind() == std::io::ErrorKind::WouldBlock {
                LockError::DirectoryBusy {
                    path: directory.to_path_buf(),
                }
            } else {
                LockError::AcquisitionFailed {
                    path: directory.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(DirectoryLock { _file: file })
    }
}
