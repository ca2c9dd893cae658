//! Per-space execution facade
//!
//! A handler binds row operations to exactly one engine. Mutations are
//! engine-specific and default to an "unsupported" error carrying the
//! engine and operation name; the select path is engine-agnostic and
//! implemented once, here, for every engine.

use crate::engine::Engine;
use crate::request::{RowRequest, RowSink};
use crate::space::Space;
use crate::transaction::Transaction;
use keel_common::{Error, IteratorType, Result};
use keel_tuple::codec;
use std::sync::Arc;

/// Per-space execution facade bound to one engine.
///
/// Handlers are stateless beyond the engine reference: all durable state
/// lives in the engine's storage.
pub trait Handler: Send + Sync {
    /// The engine this handler executes against.
    fn engine(&self) -> &dyn Engine;

    fn execute_replace(
        &self,
        txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let _ = (txn, space, request, sink);
        Err(Error::unsupported(self.engine().name(), "replace"))
    }

    fn execute_delete(
        &self,
        txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let _ = (txn, space, request, sink);
        Err(Error::unsupported(self.engine().name(), "delete"))
    }

    fn execute_update(
        &self,
        txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let _ = (txn, space, request, sink);
        Err(Error::unsupported(self.engine().name(), "update"))
    }

    fn execute_upsert(
        &self,
        txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let _ = (txn, space, request, sink);
        Err(Error::unsupported(self.engine().name(), "upsert"))
    }

    /// Engine-agnostic read path.
    ///
    /// Resolves the target index, validates the iterator type and search
    /// key, then drains an iterator honoring the request's offset and
    /// limit. The iterator and every fetched row are released on every
    /// exit path, including mid-scan failure.
    fn execute_select(
        &self,
        txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let index = space.index(request.index_id)?;
        let iterator = IteratorType::from_code(request.iterator).ok_or_else(|| {
            Error::invalid_argument(format!("Invalid iterator type {}", request.iterator))
        })?;
        let key = match &request.key {
            Some(packed) => codec::decode_packed(packed)?,
            None => Vec::new(),
        };
        // Key compatibility is enforced here, before any iterator exists.
        index.key_def().validate_key(&key, iterator)?;

        let mut it = index.create_iterator(iterator, &key)?;
        let mut offset = request.offset;
        let mut found = 0u32;
        while let Some(row) = it.next_row()? {
            if offset > 0 {
                offset -= 1;
                continue;
            }
            if found == request.limit {
                break;
            }
            found += 1;
            sink.push(row)?;
        }
        drop(it);

        if txn.is_none() {
            // No enclosing transaction to piggy-back cleanup on.
            self.engine().collect_garbage();
        }
        Ok(())
    }
}

/// Handler with no overrides: the generic select path plus "unsupported"
/// for every mutation. What a read-only or capability-limited engine gets
/// from `Engine::open` when it has nothing to add.
pub struct BaseHandler {
    engine: Arc<dyn Engine>,
}

impl BaseHandler {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

impl Handler for BaseHandler {
    fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }
}
