//! Bulk export of entries to a single calendar file.
//!
//! Exports are always written in plaintext, outside the repository's data
//! directory, so they can be handed to other calendar software.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::codec;
use crate::fsutil;
use crate::model::Entry;
use crate::errors::AppResult;

/// Serialize `entries` into one plaintext calendar file at `path`.
///
/// When the target has no file extension, `.ics` is appended. Returns the
/// path actually written.
pub fn export_entries(path: &Path, entries: &[Entry]) -> AppResult<PathBuf> {
    let target = if path.extension().is_none() {
        path.with_extension("ics")
    } else {
        path.to_path_buf()
    };
    fsutil::write_atomic(&target, codec::serialize(entries).as_bytes())?;
    info!(path = %target.display(), entries = entries.len(), "exported entries");
    Ok(target)
}
