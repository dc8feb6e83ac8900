//! End-to-end tests for the daybook binary.


use predicates::prelude::*;
use tempfile::tempdir;
use test_helpers::base_daybook_command;

#[test]
fn test_version_flag() {
    base_daybook_command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("daybook"));
}

#[test]
fn test_help_lists_subcommands() {
    base_daybook_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("passwd"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn test_add_then_list_round_trip() {
    let dir = tempdir().unwrap();

    base_daybook_command()
        .args(["add", "--date", "2024-03-15", "--summary", "First entry"])
        .args(["--category", "travel"])
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    assert!(dir.path().join("20240315.ics").exists());

    base_daybook_command()
        .arg("list")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("First entry"))
        .stdout(predicate::str::contains("2024-03-15"))
        .stdout(predicate::str::contains("travel"));
}

#[test]
fn test_years_and_categories() {
    let dir = tempdir().unwrap();

    for (date, summary, category) in [
        ("2023-01-01", "a", "Work"),
        ("2022-06-01", "b", "work"),
        ("2023-12-31", "c", "Family"),
    ] {
        base_daybook_command()
            .args(["add", "--date", date, "--summary", summary, "--category", category])
            .arg("--dir")
            .arg(dir.path())
            .assert()
            .success();
    }

    let assert = base_daybook_command()
        .arg("years")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["2023", "2022"]);

    let assert = base_daybook_command()
        .arg("categories")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    // Dedup is case-insensitive; first-seen casing in file (date) order wins,
    // and the 2022 entry's file scans before the 2023 ones.
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["work", "Family"]);
}

#[test]
fn test_delete_by_uid() {
    let dir = tempdir().unwrap();

    let assert = base_daybook_command()
        .args(["add", "--date", "2024-01-01", "--summary", "Doomed"])
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    // "Added <uid> (<date>)"
    let uid = stdout
        .split_whitespace()
        .nth(1)
        .expect("add prints the uid")
        .to_string();

    base_daybook_command()
        .args(["delete", &uid])
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));

    base_daybook_command()
        .arg("list")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Doomed").not());
}

#[test]
fn test_delete_unknown_uid_fails() {
    let dir = tempdir().unwrap();

    base_daybook_command()
        .args(["delete", "no-such-uid"])
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .failure();
}

#[test]
fn test_export_writes_standalone_calendar() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();

    base_daybook_command()
        .args(["add", "--date", "2024-05-01", "--summary", "Exported entry"])
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();

    let target = out.path().join("backup");
    base_daybook_command()
        .arg("export")
        .arg("--output")
        .arg(&target)
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 entries"));

    let exported = std::fs::read_to_string(out.path().join("backup.ics")).unwrap();
    assert!(exported.contains("BEGIN:VJOURNAL"));
    assert!(exported.contains("Exported entry"));
}

#[test]
fn test_encrypted_journal_round_trip() {
    let dir = tempdir().unwrap();

    base_daybook_command()
        .args(["add", "--date", "2024-07-01", "--summary", "Private thoughts"])
        .args(["--encrypt", "--dir"])
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("20240701.ics.enc").exists());
    let raw = std::fs::read(dir.path().join("20240701.ics.enc")).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("Private thoughts"));

    base_daybook_command()
        .arg("list")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Private thoughts"));
}

#[test]
fn test_first_run_mentions_default_passphrase() {
    let dir = tempdir().unwrap();

    base_daybook_command()
        .arg("list")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("default passphrase"));
}
