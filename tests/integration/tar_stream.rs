//! Integration tests for the incremental tar decoder

use bitrot::digest::digest_bytes;
use bitrot::{CheckOptions, Checker, Digest, TarEnd, TarError, EMPTY_DIGEST};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

use crate::integration::test_utils::{
    archive_tree, listing, paths, sum_line, write_file, TarBuilder,
};

fn sample_archive() -> Vec<u8> {
    let big: Vec<u8> = (0..1_300u32).map(|i| (i * 7 % 256) as u8).collect();
    TarBuilder::gnu()
        .dir("top/", 1_000)
        .file("top/a.txt", b"alpha", 1_000)
        .file("top/empty", b"", 1_000)
        .file(&format!("top/{}/long.bin", "n".repeat(120)), &big, 1_000)
        .symlink("top/link", "a.txt", 1_000)
        .file("z.txt", &[0u8; 512], 1_000)
        .finish()
}

fn decode_in_chunks(archive: &[u8], sizes: &[usize]) -> (TarEnd, Vec<(String, Digest)>) {
    let mut checker = Checker::new(CheckOptions::default());
    let mut decoder = checker.tar_decoder();
    let mut rest = archive;
    let mut turn = 0;
    while !rest.is_empty() {
        let size = sizes[turn % sizes.len()].clamp(1, rest.len());
        checker.feed_tar(&mut decoder, &rest[..size]).unwrap();
        rest = &rest[size..];
        turn += 1;
    }
    let end = checker.finish_tar(decoder).unwrap();
    (end, listing(checker.catalog()))
}

#[test]
fn test_single_chunk_equals_byte_by_byte() {
    let archive = sample_archive();
    let whole = decode_in_chunks(&archive, &[archive.len()]);
    let bytewise = decode_in_chunks(&archive, &[1]);

    assert_eq!(whole, bytewise);
    assert_eq!(whole.0, TarEnd::Finished);
    assert_eq!(whole.1.len(), 4);
}

proptest! {
    #[test]
    fn prop_chunk_boundaries_do_not_change_result(
        sizes in prop::collection::vec(1usize..1500, 1..16)
    ) {
        let archive = sample_archive();
        let expected = decode_in_chunks(&archive, &[archive.len()]);
        prop_assert_eq!(decode_in_chunks(&archive, &sizes), expected);
    }
}

#[test]
fn test_zero_byte_entry_gets_empty_digest() {
    let archive = TarBuilder::ustar()
        .file("empty.dat", b"", 1_000)
        .file("after.dat", b"after", 1_000)
        .finish();

    let (_, entries) = decode_in_chunks(&archive, &[archive.len()]);
    assert_eq!(
        entries,
        vec![
            ("after.dat".to_string(), digest_bytes(b"after")),
            ("empty.dat".to_string(), EMPTY_DIGEST),
        ]
    );
}

#[test]
fn test_long_name_overrides_truncated_header_name() {
    let long = format!("{}/{}", "dir".repeat(40), "file-with-a-long-name.txt");
    assert!(long.len() > 100);
    let archive = TarBuilder::gnu()
        .file(&long, b"payload", 1_000)
        .file("plain.txt", b"plain", 1_000)
        .finish();

    let (_, entries) = decode_in_chunks(&archive, &[97]);
    let names: Vec<&str> = entries.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(names, vec![long.as_str(), "plain.txt"]);
    assert_eq!(entries[0].1, digest_bytes(b"payload"));
}

#[test]
fn test_ustar_prefix_field() {
    let long = format!("some/where/{}/f.txt", "d".repeat(90));
    assert!(long.len() > 100);
    let archive = TarBuilder::ustar().file(&long, b"f", 1_000).finish();
    // a ustar writer splits the path instead of emitting a long-name record
    assert_ne!(&archive[156], &b'L');

    let (_, entries) = decode_in_chunks(&archive, &[archive.len()]);
    assert_eq!(entries, vec![(long, digest_bytes(b"f"))]);
}

#[test]
fn test_archive_of_real_tree_matches_scan() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    let long_dir = format!("{}/{}/{}", "d".repeat(60), "e".repeat(60), "f".repeat(59));
    assert_eq!(long_dir.len(), 181);
    write_file(&root, &format!("{}.txt", "l".repeat(146)), b"long name", 1_000);
    write_file(&root, &format!("{long_dir}/deep.bin"), &[9u8; 1500], 1_000);
    write_file(&root, "empty", b"", 1_000);
    write_file(&root, "a/b/c/nested.txt", b"nested", 1_000);
    fs::create_dir_all(root.join("a/hollow")).unwrap();

    let mut scanner = Checker::new(CheckOptions::default());
    scanner.scan_dir(&root).unwrap();

    let archive = archive_tree(&root);
    for sizes in [vec![archive.len()], vec![1], vec![511, 513, 7]] {
        let (end, entries) = decode_in_chunks(&archive, &sizes);
        assert_eq!(end, TarEnd::Finished);
        assert_eq!(entries, listing(scanner.catalog()));
    }
    assert_eq!(listing(scanner.catalog()).len(), 4);
}

#[test]
fn test_tar_reconciles_like_a_scan() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_file(&root, "docs/a.txt", b"alpha", 1_000);
    write_file(&root, "b.txt", b"beta", 1_000);
    let sums = temp_dir.path().join("sums.md5");

    let mut scanner = Checker::new(CheckOptions::default());
    scanner.load(&sums).unwrap();
    scanner.scan_dir(&root).unwrap();
    scanner.finish();
    scanner.persist(&sums).unwrap();
    let scanned = fs::read_to_string(&sums).unwrap();

    let archive = TarBuilder::ustar()
        .dir("docs", 1_000)
        .file("docs/a.txt", b"alpha", 1_000)
        .file("b.txt", b"beta", 1_000)
        .finish();
    let mut checker = Checker::new(CheckOptions::default());
    checker.load(&sums).unwrap();
    let end = checker.read_tar(&archive[..], None).unwrap();
    let report = checker.finish();

    assert_eq!(end, TarEnd::Finished);
    assert_eq!(report.matched, 2);
    assert_eq!(report.changes, 0);
    assert!(!checker.persist(&sums).unwrap());
    assert_eq!(fs::read_to_string(&sums).unwrap(), scanned);
}

#[test]
fn test_tar_detects_suspicious_change() {
    let temp_dir = TempDir::new().unwrap();
    let sums = temp_dir.path().join("sums.md5");
    fs::write(&sums, sum_line(b"original", "data/f.bin")).unwrap();
    crate::integration::test_utils::set_mtime(&sums, 5_000);

    let archive = TarBuilder::gnu()
        .file("data/f.bin", b"corrupt", 4_000)
        .finish();
    let mut checker = Checker::new(CheckOptions::default());
    checker.load(&sums).unwrap();
    checker.read_tar(&archive[..], None).unwrap();
    let report = checker.finish();

    assert_eq!(report.mismatched, 1);
    assert_eq!(report.mismatches[0].path, "data/f.bin");
    assert!(!report.mismatches[0].saved);
    assert!(!checker.persist(&sums).unwrap());
}

#[test]
fn test_ceiling_skips_newer_entries() {
    let archive = TarBuilder::ustar()
        .file("old", b"old", 100)
        .file("edge", b"edge", 200)
        .file("new", b"new", 300)
        .finish();
    let mut checker = Checker::new(CheckOptions {
        ceiling_mtime: Some(200),
        ..CheckOptions::default()
    });
    checker.read_tar(&archive[..], None).unwrap();
    // an entry stamped exactly at the ceiling is still cataloged
    assert_eq!(paths(checker.catalog()), vec!["edge", "old"]);
}

#[test]
fn test_truncated_archive_is_fatal() {
    let archive = TarBuilder::ustar().file("f", &[1u8; 2000], 1_000).finish();
    let mut checker = Checker::new(CheckOptions::default());
    let err = checker.read_tar(&archive[..1500], None).unwrap_err();
    assert!(matches!(err, TarError::Truncated));
}

#[test]
fn test_missing_end_marker_is_a_warning() {
    let archive = TarBuilder::ustar().file("f", b"f", 1_000).unterminated();
    let mut checker = Checker::new(CheckOptions::default());
    let end = checker.read_tar(&archive[..], None).unwrap();
    assert_eq!(end, TarEnd::MissingEndMarker);
    assert_eq!(paths(checker.catalog()), vec!["f"]);
}
