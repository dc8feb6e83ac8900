//! One on-disk entry file.
//!
//! An [`EntryFile`] owns the entries of a single calendar file, normally
//! exactly one entry per the one-file-per-date convention, and knows how to
//! load and rewrite itself. Saving is always a full-file rewrite through a
//! temp file and rename, so the on-disk content exactly reflects the
//! in-memory list whenever a write completes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codec::{self, ParseIssue};
use crate::constants;
use crate::errors::AppResult;
use crate::fsutil;
use crate::keystore::KeyStore;
use crate::model::Entry;

/// The in-memory image of one backing file.
#[derive(Debug)]
pub struct EntryFile {
    path: PathBuf,
    name: String,
    encrypted: bool,
    entries: Vec<Entry>,
    issues: Vec<ParseIssue>,
}

impl EntryFile {
    /// Load a file from disk, decrypting first when `encrypted` is set.
    ///
    /// A missing file yields an empty list (the create-new path). Malformed
    /// records are skipped and logged per the codec's loose mode unless
    /// `strict` is set. I/O and decryption failures are fatal to this file
    /// only; the caller decides whether the surrounding scan continues.
    pub fn load(
        path: &Path,
        encrypted: bool,
        keystore: &KeyStore,
        strict: bool,
    ) -> AppResult<EntryFile> {
        let mut file = EntryFile::create(path, encrypted);
        if !path.exists() {
            return Ok(file);
        }

        let raw = fs::read(path)?;
        let text = if encrypted {
            keystore.decrypt_text(&raw)?
        } else {
            String::from_utf8_lossy(&raw).into_owned()
        };

        let outcome = codec::parse(&text, strict)?;
        if !outcome.issues.is_empty() {
            warn!(
                path = %path.display(),
                skipped = outcome.issues.len(),
                "file loaded with parse issues"
            );
        }
        file.entries = outcome.entries;
        file.issues = outcome.issues;
        for entry in &mut file.entries {
            entry.file_name = Some(file.name.clone());
        }
        debug!(path = %path.display(), entries = file.entries.len(), "loaded entry file");
        Ok(file)
    }

    /// Construct an empty file image without touching the disk.
    pub fn create(path: &Path, encrypted: bool) -> EntryFile {
        EntryFile {
            name: canonical_name_of(path),
            path: path.to_path_buf(),
            encrypted,
            entries: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// The canonical (lowercased, `.enc`-stripped) file name used as the
    /// repository map key and as the entry back-reference.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actual on-disk path, including the `.enc` suffix when encrypted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Records skipped while parsing this file.
    pub fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    /// Append an entry and point its back-reference at this file. No disk
    /// write happens until [`EntryFile::write`].
    pub fn add_entry(&mut self, mut entry: Entry) {
        entry.file_name = Some(self.name.clone());
        self.entries.push(entry);
    }

    /// Replace the entry with the same uid, or append when absent.
    pub fn upsert_entry(&mut self, mut entry: Entry) {
        entry.file_name = Some(self.name.clone());
        match self.entries.iter_mut().find(|e| e.uid == entry.uid) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry with the given uid. Returns whether it was found.
    pub fn remove_entry(&mut self, uid: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.uid != uid);
        self.entries.len() != before
    }

    /// Serialize the full current entry list and rewrite the backing file,
    /// encrypting when this file is encrypted. An empty list still writes
    /// an empty calendar; emptied files persist as empty containers.
    pub fn write(&self, keystore: &KeyStore) -> AppResult<()> {
        let text = codec::serialize(&self.entries);
        let contents = if self.encrypted {
            keystore.encrypt_text(&text)?
        } else {
            text.into_bytes()
        };
        fsutil::write_atomic(&self.path, &contents)?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "wrote entry file");
        Ok(())
    }

    /// Clone of the current entry list, for rollback on a failed write.
    pub(crate) fn entries_snapshot(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    /// Restore a snapshot taken with [`EntryFile::entries_snapshot`].
    pub(crate) fn restore_entries(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
    }
}

/// Derive the canonical map key for a path: the file name, lowercased, with
/// the `.enc` suffix stripped. `20240315.ICS.enc` and `20240315.ics` both
/// map to `20240315.ics`.
pub fn canonical_name_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match name.strip_suffix(constants::ENCRYPTED_FILE_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}
