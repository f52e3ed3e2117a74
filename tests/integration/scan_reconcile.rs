//! Integration tests for directory scans reconciled against a saved catalog

use bitrot::digest::digest_bytes;
use bitrot::{CheckOptions, Checker, Mismatch};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::integration::test_utils::{listing, set_mtime, sum_line, write_file};

/// Scan `root` against `sums` and persist; returns the report.
fn run(root: &Path, sums: &Path, options: CheckOptions) -> bitrot::RunReport {
    let mut checker = Checker::new(options);
    checker.load(sums).unwrap();
    checker.scan_dir(root).unwrap();
    let report = checker.finish();
    checker.persist(sums).unwrap();
    report
}

/// Tree with `f.txt` recorded as "original" in a checksum file dated 2000.
fn recorded_tree() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    fs::create_dir(&root).unwrap();
    let sums = temp_dir.path().join("sums.md5");
    fs::write(&sums, sum_line(b"original", "f.txt")).unwrap();
    set_mtime(&sums, 2_000);
    (temp_dir, root, sums)
}

#[test]
fn test_newer_file_mtime_updates_stored_digest() {
    let (_temp, root, sums) = recorded_tree();
    write_file(&root, "f.txt", b"edited", 2_000);

    let report = run(&root, &sums, CheckOptions::default());

    assert_eq!(report.mismatched, 1);
    assert_eq!(report.changes, 1);
    assert!(report.mismatches.is_empty());
    assert_eq!(fs::read_to_string(&sums).unwrap(), sum_line(b"edited", "f.txt"));
}

#[test]
fn test_older_file_mtime_keeps_stored_digest_and_reports() {
    let (_temp, root, sums) = recorded_tree();
    write_file(&root, "f.txt", b"rotted", 1_999);

    let report = run(&root, &sums, CheckOptions::default());

    assert_eq!(report.mismatched, 1);
    assert_eq!(report.changes, 0);
    assert_eq!(
        report.mismatches,
        vec![Mismatch {
            path: "f.txt".to_string(),
            saved: false
        }]
    );
    assert_eq!(fs::read_to_string(&sums).unwrap(), sum_line(b"original", "f.txt"));
}

#[test]
fn test_save_changes_stores_suspicious_digest() {
    let (_temp, root, sums) = recorded_tree();
    write_file(&root, "f.txt", b"rotted", 1_000);

    let report = run(
        &root,
        &sums,
        CheckOptions {
            save_changes: true,
            ..CheckOptions::default()
        },
    );

    assert_eq!(report.changes, 1);
    assert!(report.mismatches[0].saved);
    assert_eq!(fs::read_to_string(&sums).unwrap(), sum_line(b"rotted", "f.txt"));
}

#[test]
fn test_suspicious_mismatch_with_new_file_keeps_old_digest() {
    let (_temp, root, sums) = recorded_tree();
    write_file(&root, "f.txt", b"rotted", 1_000);
    write_file(&root, "g.txt", b"new", 1_000);

    let report = run(&root, &sums, CheckOptions::default());

    assert_eq!(report.changes, 1);
    assert_eq!(report.new_files, 1);
    assert_eq!(
        fs::read_to_string(&sums).unwrap(),
        [sum_line(b"original", "f.txt"), sum_line(b"new", "g.txt")].concat()
    );
}

#[test]
fn test_nothing_new_only_verifies_known_files() {
    let (_temp, root, sums) = recorded_tree();
    write_file(&root, "f.txt", b"original", 1_000);
    write_file(&root, "extra.txt", b"extra", 1_000);

    let report = run(
        &root,
        &sums,
        CheckOptions {
            nothing_new: true,
            ..CheckOptions::default()
        },
    );

    assert_eq!(report.matched, 1);
    assert_eq!(report.skipped_new, 1);
    assert_eq!(report.changes, 0);
    assert_eq!(fs::read_to_string(&sums).unwrap(), sum_line(b"original", "f.txt"));
}

#[test]
fn test_not_today_skips_recent_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_file(&root, "old.txt", b"old", 1_000);
    fs::write(root.join("fresh.txt"), b"fresh").unwrap();

    let mut checker = Checker::new(CheckOptions {
        not_today: true,
        ..CheckOptions::default()
    });
    checker.scan_dir(&root).unwrap();
    let report = checker.finish();

    assert_eq!(report.skipped_recent, 1);
    assert_eq!(
        listing(checker.catalog()),
        vec![("old.txt".to_string(), digest_bytes(b"old"))]
    );
}

#[test]
fn test_missing_checksum_file_treats_everything_as_new() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_file(&root, "one", b"1", 1_000);
    write_file(&root, "dir/two", b"2", 1_000);
    let sums = temp_dir.path().join("fresh.md5");

    let report = run(&root, &sums, CheckOptions::default());

    assert_eq!(report.new_files, 2);
    assert_eq!(
        fs::read_to_string(&sums).unwrap(),
        [sum_line(b"2", "dir/two"), sum_line(b"1", "one")].concat()
    );
}

#[test]
fn test_mmap_and_buffered_reads_agree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    let big: Vec<u8> = (0..300_000u32).map(|i| (i % 241) as u8).collect();
    write_file(&root, "big.bin", &big, 1_000);
    write_file(&root, "empty", b"", 1_000);

    let mut buffered = Checker::new(CheckOptions::default());
    buffered.scan_dir(&root).unwrap();
    let mut mapped = Checker::new(CheckOptions {
        mmap: true,
        ..CheckOptions::default()
    });
    mapped.scan_dir(&root).unwrap();

    assert_eq!(listing(buffered.catalog()), listing(mapped.catalog()));
    assert_eq!(buffered.report().bytes_processed, 300_000);
}

#[test]
fn test_dry_run_never_writes() {
    let (_temp, root, sums) = recorded_tree();
    write_file(&root, "f.txt", b"edited", 3_000);
    let before = fs::read_to_string(&sums).unwrap();

    let report = run(
        &root,
        &sums,
        CheckOptions {
            dry_run: true,
            ..CheckOptions::default()
        },
    );

    assert_eq!(report.changes, 1);
    assert_eq!(fs::read_to_string(&sums).unwrap(), before);
}
