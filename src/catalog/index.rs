//! Name-keyed sibling index
//!
//! Ordered map from a byte-string name to a record handle. Each directory
//! record owns two of these: one for its child directories and one for its
//! files. Ordering is byte-wise ascending, which is also the order the
//! checksum file is written in. There is no removal; stale records are
//! filtered by their flags when the catalog is saved.

use std::collections::BTreeMap;

/// Ordered name → handle map with O(log n) lookup and insert
#[derive(Debug, Clone)]
pub struct NameIndex<Id> {
    entries: BTreeMap<Box<[u8]>, Id>,
}

impl<Id: Copy> NameIndex<Id> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Look up a record handle by exact name.
    pub fn find(&self, name: &[u8]) -> Option<Id> {
        self.entries.get(name).copied()
    }

    /// Insert a handle under `name`.
    ///
    /// The caller guarantees the name is not present yet; lookup-or-create
    /// is done one level up in the catalog.
    pub fn insert(&mut self, name: &[u8], id: Id) {
        let previous = self.entries.insert(name.into(), id);
        debug_assert!(previous.is_none(), "name inserted twice into index");
    }

    /// In-order (ascending name) traversal.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Id)> + '_ {
        self.entries.iter().map(|(name, id)| (&**name, *id))
    }

    /// Handles only, in ascending name order.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.entries.values().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Id: Copy> Default for NameIndex<Id> {
    fn default() -> Self {
        Self::new()
    }
}
