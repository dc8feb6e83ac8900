use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use chrono::NaiveDate;
use tempfile::{tempdir, TempDir};

use super::{Repository, RepositoryEvent, RepositoryOptions};
use crate::keystore::KeyStore;
use crate::model::Entry;

fn open_repository(options: RepositoryOptions) -> (TempDir, Repository) {
    let dir = tempdir().unwrap();
    let mut keystore = KeyStore::open(dir.path()).unwrap();
    keystore.initialize().unwrap();
    let repository = Repository::open(dir.path(), options, keystore).unwrap();
    (dir, repository)
}

fn record_events(repository: &mut Repository) -> Rc<RefCell<Vec<String>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    repository.subscribe(move |event| {
        let label = match event {
            RepositoryEvent::Added(e) => format!("added:{}", e.uid),
            RepositoryEvent::Updated(e) => format!("updated:{}", e.uid),
            RepositoryEvent::Deleted(e) => format!("deleted:{}", e.uid),
        };
        sink.borrow_mut().push(label);
    });
    events
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_save_new_entry_creates_canonical_file() {
    let (dir, mut repository) = open_repository(RepositoryOptions::default());
    let events = record_events(&mut repository);

    let mut entry = Entry::new(date(2024, 3, 15), "First entry");
    repository.save(&mut entry).unwrap();

    assert_eq!(entry.file_name.as_deref(), Some("20240315.ics"));
    assert_eq!(entry.sequence, 0);
    assert!(entry.last_modified.is_some());
    assert!(dir.path().join("20240315.ics").exists());
    assert_eq!(repository.entry_count(), 1);
    assert_eq!(*events.borrow(), vec![format!("added:{}", entry.uid)]);
}

#[test]
fn test_save_existing_entry_bumps_sequence_and_fires_updated() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    let mut entry = Entry::new(date(2024, 3, 15), "First draft");
    repository.save(&mut entry).unwrap();
    assert_eq!(entry.sequence, 0);

    let events = record_events(&mut repository);
    entry.summary = "Second draft".to_string();
    repository.save(&mut entry).unwrap();

    assert_eq!(entry.sequence, 1);
    assert_eq!(*events.borrow(), vec![format!("updated:{}", entry.uid)]);
    assert_eq!(repository.entry_count(), 1);
    assert_eq!(
        repository.find_by_uid(&entry.uid).unwrap().summary,
        "Second draft"
    );
}

#[test]
fn test_second_entry_same_date_appends_to_existing_file() {
    let (dir, mut repository) = open_repository(RepositoryOptions::default());

    let mut first = Entry::new(date(2024, 3, 15), "Morning");
    let mut second = Entry::new(date(2024, 3, 15), "Evening");
    repository.save(&mut first).unwrap();
    repository.save(&mut second).unwrap();

    assert_eq!(first.file_name, second.file_name);
    assert_eq!(repository.entry_count(), 2);
    let files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".ics"))
        .collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_delete_unbacked_entry_returns_false_without_events() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());
    let events = record_events(&mut repository);

    let entry = Entry::new(date(2024, 3, 15), "Never saved");
    assert!(!repository.delete(&entry).unwrap());
    assert!(events.borrow().is_empty());
}

#[test]
fn test_delete_rewrites_file_as_empty_container() {
    let (dir, mut repository) = open_repository(RepositoryOptions::default());

    let mut entry = Entry::new(date(2024, 3, 15), "Doomed");
    repository.save(&mut entry).unwrap();
    let events = record_events(&mut repository);

    assert!(repository.delete(&entry).unwrap());
    assert_eq!(*events.borrow(), vec![format!("deleted:{}", entry.uid)]);
    assert_eq!(repository.entry_count(), 0);

    // The emptied file persists as an empty container.
    let path = dir.path().join("20240315.ics");
    assert!(path.exists());
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("BEGIN:VCALENDAR"));
    assert!(!contents.contains("BEGIN:VJOURNAL"));
}

#[test]
fn test_years_are_distinct_and_descending() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    for d in [date(2023, 1, 1), date(2022, 6, 1), date(2023, 12, 31)] {
        let mut entry = Entry::new(d, "entry");
        repository.save(&mut entry).unwrap();
    }

    assert_eq!(repository.years(), vec![2023, 2022]);
}

#[test]
fn test_months_for_year_are_distinct_and_ascending() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    for d in [
        date(2023, 9, 1),
        date(2023, 2, 10),
        date(2023, 2, 20),
        date(2022, 5, 5),
    ] {
        let mut entry = Entry::new(d, "entry");
        repository.save(&mut entry).unwrap();
    }

    assert_eq!(repository.months_for_year(2023), vec![2, 9]);
    assert_eq!(repository.months_for_year(2022), vec![5]);
    assert!(repository.months_for_year(2021).is_empty());
}

#[test]
fn test_entries_by_year_and_month() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    let mut in_march = Entry::new(date(2023, 3, 10), "March");
    let mut in_april = Entry::new(date(2023, 4, 2), "April");
    let mut other_year = Entry::new(date(2020, 3, 10), "Old March");
    repository.save(&mut in_march).unwrap();
    repository.save(&mut in_april).unwrap();
    repository.save(&mut other_year).unwrap();

    assert_eq!(repository.entries_by_year(2023).len(), 2);
    let march = repository.entries_by_month(2023, 3);
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].summary, "March");
    assert!(repository.entries_by_month(2023, 5).is_empty());
}

#[test]
fn test_categories_dedup_is_case_insensitive_first_casing_wins() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    let mut first = Entry::new(date(2023, 1, 1), "a");
    first.categories = vec!["Travel".to_string(), "work".to_string()];
    let mut second = Entry::new(date(2023, 1, 2), "b");
    second.categories = vec!["TRAVEL".to_string(), "Family".to_string()];
    repository.save(&mut first).unwrap();
    repository.save(&mut second).unwrap();

    assert_eq!(
        repository.categories(),
        vec!["Travel".to_string(), "work".to_string(), "Family".to_string()]
    );
}

#[test]
fn test_rebuild_index_is_idempotent() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    for d in [date(2023, 1, 1), date(2021, 7, 4)] {
        let mut entry = Entry::new(d, "entry");
        entry.categories = vec!["one".to_string()];
        repository.save(&mut entry).unwrap();
    }

    let years = repository.years();
    let dates = repository.dates();
    let categories = repository.categories();

    repository.rebuild_index();
    repository.rebuild_index();

    assert_eq!(repository.years(), years);
    assert_eq!(repository.dates(), dates);
    assert_eq!(repository.categories(), categories);
}

#[test]
fn test_empty_repository_returns_empty_collections() {
    let (_dir, repository) = open_repository(RepositoryOptions::default());

    assert!(repository.all_entries().is_empty());
    assert!(repository.years().is_empty());
    assert!(repository.dates().is_empty());
    assert!(repository.categories().is_empty());
    assert!(repository.entries_by_year(2023).is_empty());
    assert!(repository.months_for_year(2023).is_empty());
}

#[test]
fn test_listeners_are_called_in_registration_order() {
    let (_dir, mut repository) = open_repository(RepositoryOptions::default());

    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second"] {
        let sink = Rc::clone(&order);
        repository.subscribe(move |_| sink.borrow_mut().push(tag));
    }

    let mut entry = Entry::new(date(2024, 1, 1), "entry");
    repository.save(&mut entry).unwrap();

    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn test_encrypted_file_created_when_requested() {
    let (dir, mut repository) = open_repository(RepositoryOptions {
        strict_parsing: false,
        encrypt_new_files: true,
    });

    let mut entry = Entry::new(date(2024, 3, 15), "Secret entry");
    repository.save(&mut entry).unwrap();

    // Back-reference still uses the canonical plaintext name.
    assert_eq!(entry.file_name.as_deref(), Some("20240315.ics"));
    let path = dir.path().join("20240315.ics.enc");
    assert!(path.exists());
    assert!(!dir.path().join("20240315.ics").exists());

    let raw = fs::read(path).unwrap();
    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains("BEGIN:VCALENDAR"));
    assert!(!haystack.contains("Secret entry"));
}
