//! Calendar text parsing and generation.
//!
//! This module converts between the on-disk calendar text format and
//! [`Entry`](crate::model::Entry) values. Parsing is built on the
//! `icalendar` crate's tokenizer (`unfold` + `read_calendar`); generation is
//! a small writer that emits exactly the property set daybook stores:
//! UID, DTSTART, SUMMARY, DESCRIPTION, CATEGORIES, SEQUENCE, LAST-MODIFIED,
//! CREATED and binary ATTACH.
//!
//! Parsing is tolerant by default: a malformed record is skipped and logged
//! as a [`ParseIssue`] without failing the document. Strict mode turns the
//! first malformed record into an error. A document that is not calendar
//! text at all is an error in both modes.

use crate::constants;
use crate::errors::{AppResult, CodecError};
use crate::model::{Attachment, Entry};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use icalendar::parser::{read_calendar, unfold, Component, Property};
use tracing::debug;

/// A non-fatal problem found while parsing a document.
#[derive(Debug, Clone)]
pub struct ParseIssue {
    /// Human-readable description of what was skipped and why.
    pub message: String,
}

/// The result of parsing one calendar document.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Entries parsed successfully, in document order.
    pub entries: Vec<Entry>,
    /// Malformed records and properties that were skipped.
    pub issues: Vec<ParseIssue>,
}

/// Parse calendar text into entries.
///
/// In loose mode (`strict == false`) malformed journal records are skipped
/// and reported through [`ParseOutcome::issues`]; in strict mode the first
/// malformed record fails the whole parse with
/// [`CodecError::StrictRecord`]. Components other than VJOURNAL are
/// ignored.
///
/// # Errors
///
/// Returns [`CodecError::Document`] when the text is not parseable calendar
/// syntax at all.
pub fn parse(text: &str, strict: bool) -> AppResult<ParseOutcome> {
    let unfolded = unfold(text);
    let calendar =
        read_calendar(&unfolded).map_err(|e| CodecError::Document(e.to_string()))?;

    let mut outcome = ParseOutcome::default();
    for component in &calendar.components {
        if component.name != "VJOURNAL" {
            continue;
        }
        match parse_journal(component, &mut outcome.issues) {
            Ok(entry) => outcome.entries.push(entry),
            Err(reason) => {
                if strict {
                    return Err(CodecError::StrictRecord(reason).into());
                }
                debug!(reason = %reason, "skipping malformed journal record");
                outcome.issues.push(ParseIssue { message: reason });
            }
        }
    }
    Ok(outcome)
}

/// Serialize entries to calendar text.
///
/// Always produces a complete VCALENDAR, CRLF line endings, content lines
/// folded at 75 octets. An empty entry list yields an empty (but valid)
/// calendar — emptied files stay behind as empty containers rather than
/// vanishing.
pub fn serialize(entries: &[Entry]) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{}", constants::CALENDAR_PROD_ID));
    for entry in entries {
        write_journal(&mut out, entry);
    }
    push_line(&mut out, "END:VCALENDAR");
    out
}

fn write_journal(out: &mut String, entry: &Entry) {
    push_line(out, "BEGIN:VJOURNAL");
    push_line(out, &format!("UID:{}", escape_text(&entry.uid)));
    match entry.time {
        Some(time) => push_line(
            out,
            &format!(
                "DTSTART:{}",
                entry
                    .date
                    .and_time(time)
                    .format(constants::DATETIME_FORMAT_COMPACT)
            ),
        ),
        None => push_line(
            out,
            &format!(
                "DTSTART;VALUE=DATE:{}",
                entry.date.format(constants::DATE_FORMAT_COMPACT)
            ),
        ),
    }
    if !entry.summary.is_empty() {
        push_line(out, &format!("SUMMARY:{}", escape_text(&entry.summary)));
    }
    if !entry.description.is_empty() {
        push_line(
            out,
            &format!("DESCRIPTION:{}", escape_text(&entry.description)),
        );
    }
    if !entry.categories.is_empty() {
        let joined = entry
            .categories
            .iter()
            .map(|c| escape_text(c))
            .collect::<Vec<_>>()
            .join(",");
        push_line(out, &format!("CATEGORIES:{}", joined));
    }
    if entry.sequence > 0 {
        push_line(out, &format!("SEQUENCE:{}", entry.sequence));
    }
    if let Some(modified) = entry.last_modified {
        push_line(
            out,
            &format!(
                "LAST-MODIFIED:{}",
                modified.format(constants::TIMESTAMP_FORMAT_UTC)
            ),
        );
    }
    if let Some(created) = entry.created {
        push_line(
            out,
            &format!("CREATED:{}", created.format(constants::TIMESTAMP_FORMAT_UTC)),
        );
    }
    for attachment in &entry.attachments {
        push_line(
            out,
            &format!(
                "ATTACH;X-FILENAME={};FMTTYPE={};ENCODING=BASE64;VALUE=BINARY:{}",
                attachment.filename,
                attachment.mime_type,
                STANDARD.encode(&attachment.data)
            ),
        );
    }
    push_line(out, "END:VJOURNAL");
}

fn parse_journal(journal: &Component, issues: &mut Vec<ParseIssue>) -> Result<Entry, String> {
    let uid = journal
        .find_prop("UID")
        .map(|p| unescape_text(p.val.as_ref()))
        .ok_or_else(|| "journal record has no UID".to_string())?;

    // The filing date decides which file the entry belongs to, so a record
    // without one cannot be stored and counts as malformed.
    let dtstart = journal
        .find_prop("DTSTART")
        .ok_or_else(|| format!("journal record {} has no DTSTART", uid))?;
    let (date, time) = parse_start(dtstart)
        .ok_or_else(|| format!("journal record {} has an unreadable DTSTART", uid))?;

    let summary = journal
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();
    let description = journal
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();

    let mut categories = Vec::new();
    for prop in journal.properties.iter().filter(|p| p.name == "CATEGORIES") {
        for raw in split_unescaped_commas(prop.val.as_ref()) {
            let category = unescape_text(raw.trim());
            if !category.is_empty() {
                categories.push(category);
            }
        }
    }

    let sequence = journal
        .find_prop("SEQUENCE")
        .and_then(|p| p.val.as_ref().parse().ok())
        .unwrap_or(0);

    let last_modified = journal
        .find_prop("LAST-MODIFIED")
        .and_then(|p| parse_utc_timestamp(p.val.as_ref()));
    let created = journal
        .find_prop("CREATED")
        .and_then(|p| parse_utc_timestamp(p.val.as_ref()));

    let mut attachments = Vec::new();
    for prop in journal.properties.iter().filter(|p| p.name == "ATTACH") {
        match parse_attachment(prop) {
            Ok(attachment) => attachments.push(attachment),
            Err(reason) => issues.push(ParseIssue {
                message: format!("attachment skipped in record {}: {}", uid, reason),
            }),
        }
    }

    Ok(Entry {
        uid,
        date,
        time,
        summary,
        description,
        categories,
        attachments,
        sequence,
        last_modified,
        created,
        file_name: None,
    })
}

/// Parse a DTSTART value into a filing date and optional time-of-day.
///
/// Accepts `YYYYMMDD` (DATE values) and `YYYYMMDDTHHMMSS` with an optional
/// trailing `Z`, which is treated as a naive local stamp.
fn parse_start(prop: &Property) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let raw = prop.val.as_ref();
    let raw = raw.strip_suffix('Z').unwrap_or(raw);
    if let Ok(datetime) =
        NaiveDateTime::parse_from_str(raw, constants::DATETIME_FORMAT_COMPACT)
    {
        return Some((datetime.date(), Some(datetime.time())));
    }
    NaiveDate::parse_from_str(raw, constants::DATE_FORMAT_COMPACT)
        .ok()
        .map(|date| (date, None))
}

fn parse_utc_timestamp(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let trimmed = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(trimmed, constants::DATETIME_FORMAT_COMPACT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_attachment(prop: &Property) -> Result<Attachment, String> {
    let encoding = param(prop, "ENCODING").unwrap_or_default();
    if !encoding.eq_ignore_ascii_case("BASE64") {
        return Err("only inline BASE64 attachments are supported".to_string());
    }
    let data = STANDARD
        .decode(prop.val.as_ref())
        .map_err(|e| format!("invalid base64 payload: {}", e))?;
    Ok(Attachment {
        filename: param(prop, "X-FILENAME").unwrap_or("attachment").to_string(),
        mime_type: param(prop, "FMTTYPE")
            .unwrap_or("application/octet-stream")
            .to_string(),
        data,
    })
}

fn param<'a>(prop: &'a Property, key: &str) -> Option<&'a str> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref())
        .map(|v| v.as_ref())
}

/// Split a property value on commas that are not backslash-escaped.
fn split_unescaped_commas(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            parts.push(&value[start..i]);
            start = i + 1;
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Escape TEXT values: backslash, semicolon, comma, and newlines.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reverse of [`escape_text`]. Unknown escapes pass through verbatim.
fn unescape_text(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(',') => unescaped.push(','),
            Some(';') => unescaped.push(';'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Append one content line, folded at [`constants::FOLD_WIDTH`] octets with
/// CRLF terminators and a single-space continuation marker.
fn push_line(out: &mut String, line: &str) {
    let mut limit = constants::FOLD_WIDTH;
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > limit {
            out.push_str("\r\n ");
            // Continuation lines lose one octet to the leading space.
            limit = constants::FOLD_WIDTH - 1;
            used = 0;
        }
        out.push(c);
        used += width;
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> Entry {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut entry = Entry::new(date, "Morning pages");
        entry.description = "Long walk;\nthen coffee, with a friend".to_string();
        entry.categories = vec!["Travel".to_string(), "Notes, misc".to_string()];
        entry.sequence = 2;
        entry.last_modified = parse_utc_timestamp("20240315T101500Z");
        entry.created = parse_utc_timestamp("20240314T220000Z");
        entry.attachments.push(Attachment {
            filename: "receipt.png".to_string(),
            mime_type: "image/png".to_string(),
            data: vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff],
        });
        entry
    }

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let original = sample_entry();
        let text = serialize(std::slice::from_ref(&original));

        let outcome = parse(&text, true).unwrap();
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0], original);
    }

    #[test]
    fn test_round_trip_date_with_time() {
        let mut original = sample_entry();
        original.time = NaiveTime::from_hms_opt(8, 30, 0);

        let text = serialize(std::slice::from_ref(&original));
        let outcome = parse(&text, true).unwrap();
        assert_eq!(outcome.entries[0].time, original.time);
        assert_eq!(outcome.entries[0].date, original.date);
    }

    #[test]
    fn test_empty_list_round_trips_to_empty_calendar() {
        let text = serialize(&[]);
        assert!(text.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(text.ends_with("END:VCALENDAR\r\n"));

        let outcome = parse(&text, true).unwrap();
        assert!(outcome.entries.is_empty());
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_long_lines_are_folded() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut entry = Entry::new(date, "x".repeat(200));
        entry.description = "y".repeat(300);

        let text = serialize(std::slice::from_ref(&entry));
        for line in text.split("\r\n") {
            assert!(line.len() <= constants::FOLD_WIDTH, "unfolded line: {}", line);
        }

        let outcome = parse(&text, true).unwrap();
        assert_eq!(outcome.entries[0].summary, entry.summary);
        assert_eq!(outcome.entries[0].description, entry.description);
    }

    #[test]
    fn test_loose_parse_skips_record_without_dtstart() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VJOURNAL\r\n",
            "UID:broken@example\r\n",
            "SUMMARY:No date here\r\n",
            "END:VJOURNAL\r\n",
            "BEGIN:VJOURNAL\r\n",
            "UID:ok@example\r\n",
            "DTSTART;VALUE=DATE:20230601\r\n",
            "SUMMARY:Fine\r\n",
            "END:VJOURNAL\r\n",
            "END:VCALENDAR\r\n",
        );

        let outcome = parse(text, false).unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].uid, "ok@example");
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].message.contains("DTSTART"));
    }

    #[test]
    fn test_strict_parse_fails_on_malformed_record() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VJOURNAL\r\n",
            "UID:broken@example\r\n",
            "END:VJOURNAL\r\n",
            "END:VCALENDAR\r\n",
        );

        assert!(parse(text, true).is_err());
    }

    #[test]
    fn test_non_journal_components_are_ignored() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:event@example\r\n",
            "DTSTART:20230601T090000\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let outcome = parse(text, true).unwrap();
        assert!(outcome.entries.is_empty());
    }

    #[test]
    fn test_escaping_round_trip() {
        assert_eq!(unescape_text(&escape_text("a,b;c\\d\ne")), "a,b;c\\d\ne");
    }

    #[test]
    fn test_split_unescaped_commas() {
        assert_eq!(split_unescaped_commas("a,b\\,c,d"), vec!["a", "b\\,c", "d"]);
    }
}
