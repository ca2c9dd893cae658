//! Ordered in-memory index
//!
//! Rows are keyed by the sortable binary encoding of their extracted key,
//! so range scans over partial keys reduce to byte-prefix ranges on the
//! underlying tree. Iterators capture the matching rows at creation time
//! and stay valid however the tree changes afterwards.

use keel_common::{IndexId, IteratorType, Result};
use keel_engine::{Index, RowIterator};
use keel_tuple::{KeyDef, Tuple, Value, codec};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Unique ordered index over one space's rows.
pub struct TreeIndex {
    id: IndexId,
    name: String,
    key_def: KeyDef,
    tree: RwLock<BTreeMap<Vec<u8>, Tuple>>,
}

impl TreeIndex {
    pub fn new(id: IndexId, name: impl Into<String>, key_def: KeyDef) -> Self {
        Self {
            id,
            name: name.into(),
            key_def,
            tree: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_def(&self) -> &KeyDef {
        &self.key_def
    }

    pub fn len(&self) -> usize {
        self.tree.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.read().is_empty()
    }

    /// Insert or replace by this index's key; returns the displaced row.
    pub(crate) fn insert(&self, tuple: Tuple) -> Result<Option<Tuple>> {
        let key = codec::encode_key(&self.key_def.extract_key(&tuple)?);
        Ok(self.tree.write().insert(key, tuple))
    }

    /// Remove the row stored under this row's key, if any.
    pub(crate) fn remove(&self, tuple: &Tuple) -> Result<Option<Tuple>> {
        let key = codec::encode_key(&self.key_def.extract_key(tuple)?);
        Ok(self.tree.write().remove(&key))
    }

    /// Point lookup by full unpacked key.
    pub(crate) fn get(&self, key: &[Value]) -> Option<Tuple> {
        self.tree.read().get(&codec::encode_key(key)).cloned()
    }

    pub(crate) fn clear(&self) {
        self.tree.write().clear();
    }

    /// Every row in ascending key order.
    pub(crate) fn all_rows(&self) -> Vec<Tuple> {
        self.tree.read().values().cloned().collect()
    }

    /// Rows matched by a scan mode and (possibly partial) key, in scan
    /// order.
    fn matching_rows(&self, iterator: IteratorType, key: &[Value]) -> Vec<Tuple> {
        let tree = self.tree.read();
        if key.is_empty() {
            // No key: unrestricted in the mode's direction.
            let rows = tree.values().cloned();
            return if iterator.is_reverse() {
                rows.rev().collect()
            } else {
                rows.collect()
            };
        }

        let prefix = codec::encode_key(key);
        match iterator {
            // The unrestricted scan ignores its key.
            IteratorType::All => tree.values().cloned().collect(),
            IteratorType::Eq => tree.get(&prefix).cloned().into_iter().collect(),
            IteratorType::Ge => tree
                .range((Bound::Included(prefix), Bound::Unbounded))
                .map(|(_, row)| row.clone())
                .collect(),
            IteratorType::Gt => match codec::prefix_successor(&prefix) {
                // Skip every row whose key extends or equals the prefix.
                Some(from) => tree
                    .range((Bound::Included(from), Bound::Unbounded))
                    .map(|(_, row)| row.clone())
                    .collect(),
                None => Vec::new(),
            },
            IteratorType::Le => match codec::prefix_successor(&prefix) {
                Some(to) => tree
                    .range((Bound::Unbounded, Bound::Excluded(to)))
                    .rev()
                    .map(|(_, row)| row.clone())
                    .collect(),
                None => tree.values().rev().cloned().collect(),
            },
            IteratorType::Lt => tree
                .range((Bound::Unbounded, Bound::Excluded(prefix)))
                .rev()
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }
}

impl Index for TreeIndex {
    fn id(&self) -> IndexId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn key_def(&self) -> &KeyDef {
        &self.key_def
    }

    fn create_iterator(
        &self,
        iterator: IteratorType,
        key: &[Value],
    ) -> Result<Box<dyn RowIterator>> {
        Ok(Box::new(TreeIterator {
            rows: self.matching_rows(iterator, key).into_iter(),
        }))
    }
}

struct TreeIterator {
    rows: std::vec::IntoIter<Tuple>,
}

impl RowIterator for TreeIterator {
    fn next_row(&mut self) -> Result<Option<Tuple>> {
        Ok(self.rows.next())
    }
}
