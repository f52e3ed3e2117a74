//! Integration tests for checksum-file load/save behavior

use bitrot::catalog::Catalog;
use bitrot::checksum_file::{self, LoadOutcome};
use bitrot::{CheckOptions, Checker, ChecksumFileError};
use std::fs;
use tempfile::TempDir;

use crate::integration::test_utils::{paths, sum_line, write_file};

#[test]
fn test_load_then_save_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    for (rel, body) in [("a/sub/w.txt", b"w"), ("a/y.txt", b"y"), ("b/x.txt", b"x"), ("z.txt", b"z")] {
        write_file(&root, rel, body, 1_000);
    }
    let sums = temp_dir.path().join("sums.md5");
    let original = [
        sum_line(b"w", "a/sub/w.txt"),
        sum_line(b"y", "a/y.txt"),
        sum_line(b"x", "b/x.txt"),
        sum_line(b"z", "z.txt"),
    ]
    .concat();
    fs::write(&sums, &original).unwrap();

    let mut checker = Checker::new(CheckOptions::default());
    checker.load(&sums).unwrap();
    checker.scan_dir(&root).unwrap();
    let report = checker.finish();
    assert_eq!(report.matched, 4);
    assert_eq!(report.changes, 0);

    let mut out = Vec::new();
    checksum_file::write_to(checker.catalog(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), original);
}

#[test]
fn test_save_orders_subdirectories_before_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_file(&root, "b/x.txt", b"x", 1_000);
    write_file(&root, "a/y.txt", b"y", 1_000);
    write_file(&root, "z.txt", b"z", 1_000);
    write_file(&root, "a/sub/w.txt", b"w", 1_000);
    let sums = temp_dir.path().join("sums.md5");

    let mut checker = Checker::new(CheckOptions::default());
    checker.load(&sums).unwrap();
    checker.scan_dir(&root).unwrap();
    checker.finish();
    assert!(checker.persist(&sums).unwrap());

    let expected = [
        sum_line(b"w", "a/sub/w.txt"),
        sum_line(b"y", "a/y.txt"),
        sum_line(b"x", "b/x.txt"),
        sum_line(b"z", "z.txt"),
    ]
    .concat();
    assert_eq!(fs::read_to_string(&sums).unwrap(), expected);
}

#[test]
fn test_entries_absent_from_scan_are_pruned() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_file(&root, "kept.txt", b"kept", 1_000);
    let sums = temp_dir.path().join("sums.md5");
    fs::write(
        &sums,
        [sum_line(b"gone", "old/gone.txt"), sum_line(b"kept", "kept.txt")].concat(),
    )
    .unwrap();

    let mut checker = Checker::new(CheckOptions::default());
    checker.load(&sums).unwrap();
    // One new file forces a rewrite.
    write_file(&root, "new.txt", b"new", 1_000);
    checker.scan_dir(&root).unwrap();
    let report = checker.finish();
    assert_eq!(report.missing, 1);
    assert!(checker.persist(&sums).unwrap());

    let saved = fs::read_to_string(&sums).unwrap();
    assert!(!saved.contains("old/gone.txt"));
    assert_eq!(saved, [sum_line(b"kept", "kept.txt"), sum_line(b"new", "new.txt")].concat());
}

#[test]
fn test_comments_and_blank_lines_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let sums = temp_dir.path().join("sums.md5");
    fs::write(
        &sums,
        format!("# generated\n\n{}", sum_line(b"data", "./dir/./f.bin")),
    )
    .unwrap();

    let mut catalog = Catalog::new();
    let outcome = checksum_file::load(&mut catalog, &sums).unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { entries: 1, .. }));
    assert_eq!(paths(&catalog), vec!["dir/f.bin"]);
}

#[test]
fn test_conflicting_duplicate_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let sums = temp_dir.path().join("sums.md5");
    fs::write(&sums, [sum_line(b"one", "f"), sum_line(b"two", "f")].concat()).unwrap();

    let mut catalog = Catalog::new();
    let err = checksum_file::load(&mut catalog, &sums).unwrap_err();
    assert!(matches!(err, ChecksumFileError::DuplicateEntry { line: 2, .. }));
}

#[test]
fn test_identical_duplicate_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let sums = temp_dir.path().join("sums.md5");
    fs::write(&sums, [sum_line(b"one", "f"), sum_line(b"one", "f")].concat()).unwrap();

    let mut catalog = Catalog::new();
    checksum_file::load(&mut catalog, &sums).unwrap();
    assert_eq!(catalog.file_count(), 1);
}

#[test]
fn test_malformed_lines_report_line_numbers() {
    let temp_dir = TempDir::new().unwrap();
    let sums = temp_dir.path().join("sums.md5");

    fs::write(&sums, format!("{}short\n", sum_line(b"a", "a"))).unwrap();
    let err = checksum_file::load(&mut Catalog::new(), &sums).unwrap_err();
    assert!(matches!(err, ChecksumFileError::ShortLine { line: 2, .. }));

    fs::write(&sums, format!("{} x  path\n", "z".repeat(31))).unwrap();
    let err = checksum_file::load(&mut Catalog::new(), &sums).unwrap_err();
    assert!(matches!(err, ChecksumFileError::BadHash { line: 1, .. }));

    fs::write(&sums, format!("{} -path\n", "0".repeat(32))).unwrap();
    let err = checksum_file::load(&mut Catalog::new(), &sums).unwrap_err();
    assert!(matches!(err, ChecksumFileError::BadDelimiter { line: 1, .. }));

    fs::write(&sums, format!("{}  {}", "0".repeat(32), "p".repeat(3000))).unwrap();
    let err = checksum_file::load(&mut Catalog::new(), &sums).unwrap_err();
    assert!(matches!(err, ChecksumFileError::LineTooLong { line: 1, .. }));
}
