//! Per-space storage state
//!
//! A space's rows live in its indexes; the primary index is the
//! authoritative copy and every secondary must agree with it after each
//! mutation.

use crate::index::TreeIndex;
use keel_common::{Error, IndexId, Result};
use keel_engine::SpaceDef;
use keel_tuple::Tuple;
use std::sync::Arc;

pub(crate) struct MemorySpace {
    pub(crate) def: SpaceDef,
    /// Indexes sorted by id; index 0 is the primary key.
    pub(crate) indexes: Vec<Arc<TreeIndex>>,
}

impl MemorySpace {
    pub(crate) fn primary(&self) -> &Arc<TreeIndex> {
        &self.indexes[0]
    }

    pub(crate) fn index(&self, id: IndexId) -> Result<&Arc<TreeIndex>> {
        self.indexes
            .iter()
            .find(|index| index.id() == id)
            .ok_or_else(|| Error::no_such_index(id))
    }

    /// Insert or replace by primary key, keeping every index consistent.
    ///
    /// Returns the displaced row, if any. Unique-index conflicts are
    /// detected before any index is touched, so a failed replace leaves
    /// the space unchanged.
    pub(crate) fn replace(&self, new: Tuple) -> Result<Option<Tuple>> {
        let primary = self.primary();
        let new_key = primary.key_def().extract_key(&new)?;
        let old = primary.get(&new_key);

        for index in &self.indexes[1..] {
            let key = index.key_def().extract_key(&new)?;
            if let Some(existing) = index.get(&key) {
                let displaces_old = old.as_ref().is_some_and(|o| *o == existing);
                if !displaces_old {
                    return Err(Error::invalid_argument(format!(
                        "Duplicate key in unique index '{}' of space '{}'",
                        index.name(),
                        self.def.name
                    )));
                }
            }
        }

        primary.insert(new.clone())?;
        for index in &self.indexes[1..] {
            if let Some(old) = &old {
                index.remove(old)?;
            }
            index.insert(new.clone())?;
        }
        Ok(old)
    }

    /// Remove a row from every index.
    pub(crate) fn delete(&self, row: &Tuple) -> Result<()> {
        for index in &self.indexes {
            index.remove(row)?;
        }
        Ok(())
    }

    pub(crate) fn clear(&self) {
        for index in &self.indexes {
            index.clear();
        }
    }
}
