//! The entry data model.
//!
//! An [`Entry`] is one diary record: a filing date, a subject, free-form
//! text, tags, and optional binary attachments. Entries carry the
//! bookkeeping fields of the calendar format they are stored in (uid,
//! sequence number, timestamps) plus a back-reference to the backing file,
//! kept as a canonical file name rather than an object reference so that
//! ownership stays with the repository.

use crate::constants;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// A binary attachment carried inline by an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original file name of the attachment.
    pub filename: String,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Raw attachment bytes.
    pub data: Vec<u8>,
}

/// A single diary record.
///
/// # Examples
///
/// ```
/// use daybook::model::Entry;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let entry = Entry::new(date, "Ran along the river");
/// assert_eq!(entry.canonical_file_name(), "20240315.ics");
/// assert_eq!(entry.sequence, 0);
/// assert!(!entry.is_persisted());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Stable unique identity, assigned at creation and never reassigned.
    pub uid: String,
    /// Filing date; decides which backing file the entry belongs to.
    pub date: NaiveDate,
    /// Optional time-of-day component of the start.
    pub time: Option<NaiveTime>,
    /// Short subject text.
    pub summary: String,
    /// Free-form long text.
    pub description: String,
    /// Tag list; serialized comma-separated.
    pub categories: Vec<String>,
    /// Inline binary attachments.
    pub attachments: Vec<Attachment>,
    /// Monotonic edit counter, bumped by the repository on each save of a
    /// previously persisted entry.
    pub sequence: u32,
    /// Set by the repository on every successful save.
    pub last_modified: Option<DateTime<Utc>>,
    /// Set once at creation.
    pub created: Option<DateTime<Utc>>,
    /// Canonical name of the backing file (`yyyymmdd.ics`, lowercased), or
    /// `None` for an entry that has never been saved. Resolved through the
    /// repository's file map at save/delete time.
    pub file_name: Option<String>,
}

impl Entry {
    /// Create a new in-memory entry for the given filing date.
    ///
    /// The uid is generated immediately; the entry is not backed by any
    /// file until the repository saves it.
    pub fn new(date: NaiveDate, summary: impl Into<String>) -> Self {
        Entry {
            uid: generate_uid(),
            date,
            time: None,
            summary: summary.into(),
            description: String::new(),
            categories: Vec::new(),
            attachments: Vec::new(),
            sequence: 0,
            last_modified: None,
            created: Some(Utc::now()),
            file_name: None,
        }
    }

    /// The canonical file name this entry files into, derived from its
    /// filing date: `YYYYMMDD.ics`.
    pub fn canonical_file_name(&self) -> String {
        canonical_file_name(self.date)
    }

    /// Whether this entry is currently backed by a file on disk.
    pub fn is_persisted(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Map a filing date to its canonical file name (`YYYYMMDD.ics`).
pub fn canonical_file_name(date: NaiveDate) -> String {
    format!(
        "{}{}",
        date.format(constants::DATE_FORMAT_COMPACT),
        constants::ENTRY_FILE_EXTENSION
    )
}

/// Generate a unique entry uid.
///
/// Combines a local timestamp with a random UUID, in the
/// `daybook-YYYYMMDD-HHMMSS-<uuid>@daybook` shape.
pub fn generate_uid() -> String {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    format!("{}-{}-{}@{}", constants::APP_NAME, stamp, Uuid::new_v4(), constants::APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_defaults() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        let entry = Entry::new(date, "subject");

        assert_eq!(entry.date, date);
        assert_eq!(entry.summary, "subject");
        assert_eq!(entry.sequence, 0);
        assert!(entry.description.is_empty());
        assert!(entry.categories.is_empty());
        assert!(entry.attachments.is_empty());
        assert!(entry.created.is_some());
        assert!(entry.last_modified.is_none());
        assert!(entry.file_name.is_none());
    }

    #[test]
    fn test_canonical_file_name_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(canonical_file_name(date), "20240305.ics");
    }

    #[test]
    fn test_uids_are_unique() {
        let a = generate_uid();
        let b = generate_uid();
        assert_ne!(a, b);
        assert!(a.starts_with("daybook-"));
        assert!(a.ends_with("@daybook"));
    }
}
