//! Small filesystem helpers shared by the key store and entry files.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::errors::AppResult;

/// Write `contents` to `path` through a temp file in the same directory,
/// then rename over the target, so a crash mid-write never leaves a
/// truncated file behind.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> AppResult<()> {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(directory)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
