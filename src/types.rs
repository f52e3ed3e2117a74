//! Core value types shared across the catalog, codec, scanner and decoder.

use std::fmt;

/// Length in bytes of a content digest (MD5).
pub const DIGEST_LEN: usize = 16;

/// Length of a digest rendered as lowercase hex.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// 16-byte content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

/// Digest of the empty byte sequence.
pub const EMPTY_DIGEST: Digest = Digest([
    0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8, 0x42,
    0x7e,
]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex form as written to checksum files.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode exactly `DIGEST_HEX_LEN` hex characters (either case).
    pub fn from_hex(text: &[u8]) -> Option<Self> {
        if text.len() != DIGEST_HEX_LEN {
            return None;
        }
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(text, &mut out).ok()?;
        Some(Digest(out))
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Handle to a directory record inside a [`Catalog`](crate::catalog::Catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(pub(crate) usize);

/// Handle to a file record inside a [`Catalog`](crate::catalog::Catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

/// Render a raw path or name for messages.
pub fn display_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
