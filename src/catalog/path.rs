//! Path decomposition for catalog entries
//!
//! Entry paths are raw byte strings using `/` as the separator, as they
//! appear in checksum files and tar headers.

/// Split an entry path into its directory part and final file name.
///
/// `"a/b/c.txt"` yields `("a/b", "c.txt")`; a path without a slash has an
/// empty directory part.
pub fn split_file_name(path: &[u8]) -> (&[u8], &[u8]) {
    match path.iter().rposition(|&b| b == b'/') {
        Some(slash) => (&path[..slash], &path[slash + 1..]),
        None => (&path[..0], path),
    }
}

/// Directory segments of `dirs`, skipping `.` and empty segments.
pub fn dir_segments(dirs: &[u8]) -> impl Iterator<Item = &[u8]> {
    dirs.split(|&b| b == b'/')
        .filter(|segment| !segment.is_empty() && *segment != b".")
}

/// Append `name` and a trailing slash to a directory prefix buffer.
pub(crate) fn push_dir(prefix: &mut Vec<u8>, name: &[u8]) {
    if !name.is_empty() {
        prefix.extend_from_slice(name);
        prefix.push(b'/');
    }
}
