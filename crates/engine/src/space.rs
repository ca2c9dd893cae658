//! Space and index seams
//!
//! A space is the unit a handler executes against: a definition plus the
//! ordered list of its indexes. The `Index` and `RowIterator` traits are
//! the polymorphic seam each engine's index implementations plug into.

use keel_common::{Error, IndexId, IteratorType, Result, SpaceId};
use keel_tuple::{KeyDef, Tuple, Value};
use std::sync::Arc;

/// Static description of a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceDef {
    pub id: SpaceId,
    pub name: String,
}

impl SpaceDef {
    pub fn new(id: SpaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One index of a space, owned by some engine.
pub trait Index: Send + Sync {
    fn id(&self) -> IndexId;

    fn name(&self) -> &str;

    /// Key description used for validation and comparison.
    fn key_def(&self) -> &KeyDef;

    /// Allocate an iterator positioned according to the scan mode and
    /// unpacked key. The key must already be validated against
    /// `key_def()`; iterators do not re-check it.
    fn create_iterator(
        &self,
        iterator: IteratorType,
        key: &[Value],
    ) -> Result<Box<dyn RowIterator>>;
}

/// Cursor over the rows produced by one index scan.
///
/// The sequence is lazy, finite and non-restartable. Dropping the iterator
/// releases it; callers that allocate one must let it drop on every exit
/// path before the enclosing operation returns.
pub trait RowIterator: Send {
    /// Next row, or `None` when the scan is exhausted.
    fn next_row(&mut self) -> Result<Option<Tuple>>;
}

/// A space: definition plus ordered index list.
pub struct Space {
    def: SpaceDef,
    indexes: Vec<Arc<dyn Index>>,
}

impl Space {
    pub fn new(def: SpaceDef, indexes: Vec<Arc<dyn Index>>) -> Self {
        Self { def, indexes }
    }

    pub fn id(&self) -> SpaceId {
        self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &SpaceDef {
        &self.def
    }

    /// Look an index up by id.
    pub fn index(&self, id: IndexId) -> Result<&Arc<dyn Index>> {
        self.indexes
            .iter()
            .find(|index| index.id() == id)
            .ok_or_else(|| Error::no_such_index(id))
    }

    /// The primary index (id 0).
    pub fn primary_key(&self) -> Result<&Arc<dyn Index>> {
        self.index(0)
    }

    /// Indexes in id order as constructed.
    pub fn indexes(&self) -> &[Arc<dyn Index>] {
        &self.indexes
    }
}
