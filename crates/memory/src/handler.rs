//! Row mutations for the memory engine
//!
//! The handler resolves the target space inside its engine and applies
//! mutations through the space state, so every index stays consistent.
//! Reads go through the generic select path unchanged.

use crate::engine::MemoryEngine;
use crate::space::MemorySpace;
use keel_common::{Error, IteratorType, Result};
use keel_engine::{Engine, Handler, RowRequest, RowSink, Space, Transaction, UpdateOp};
use keel_tuple::{Tuple, Value, codec};
use std::sync::Arc;

/// Per-space execution facade of the memory engine.
pub struct MemoryHandler {
    engine: Arc<MemoryEngine>,
}

impl MemoryHandler {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self { engine }
    }

    fn decode_row(request: &RowRequest) -> Result<Tuple> {
        let packed = request
            .tuple
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("Request carries no row payload"))?;
        Ok(Tuple::new(codec::decode_packed(packed)?))
    }

    fn decode_key(request: &RowRequest) -> Result<Vec<Value>> {
        let packed = request
            .key
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("Request carries no key"))?;
        codec::decode_packed(packed)
    }

    /// Locate the row a keyed mutation addresses. Requires a full key on
    /// the request's index.
    fn find_by_key(state: &MemorySpace, request: &RowRequest) -> Result<Option<Tuple>> {
        let key = Self::decode_key(request)?;
        let index = state.index(request.index_id)?;
        index.key_def().validate_key(&key, IteratorType::Eq)?;
        Ok(index.get(&key))
    }

    fn apply_ops(row: &Tuple, ops: &[UpdateOp]) -> Result<Tuple> {
        let mut fields = row.fields().to_vec();
        for op in ops {
            let slot = fields.get_mut(op.field_no as usize).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Update references field {} of a {}-field tuple",
                    op.field_no,
                    row.field_count()
                ))
            })?;
            *slot = op.value.clone();
        }
        Ok(Tuple::new(fields))
    }

    fn check_primary_key_unchanged(
        state: &MemorySpace,
        space: &Space,
        old: &Tuple,
        new: &Tuple,
    ) -> Result<()> {
        let key_def = state.primary().key_def();
        if key_def.extract_key(new)? != key_def.extract_key(old)? {
            return Err(Error::invalid_argument(format!(
                "Attempt to modify the primary key of space '{}'",
                space.name()
            )));
        }
        Ok(())
    }
}

impl Handler for MemoryHandler {
    fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    fn execute_replace(
        &self,
        _txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let state = self.engine.space_state(space.id())?;
        let new = Self::decode_row(request)?;
        state.replace(new.clone())?;
        sink.push(new)
    }

    fn execute_delete(
        &self,
        _txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let state = self.engine.space_state(space.id())?;
        match Self::find_by_key(&state, request)? {
            Some(old) => {
                state.delete(&old)?;
                sink.push(old)
            }
            // Deleting a missing row is not an error.
            None => Ok(()),
        }
    }

    fn execute_update(
        &self,
        _txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let state = self.engine.space_state(space.id())?;
        let Some(old) = Self::find_by_key(&state, request)? else {
            // Updating a missing row is not an error.
            return Ok(());
        };
        let new = Self::apply_ops(&old, &request.ops)?;
        Self::check_primary_key_unchanged(&state, space, &old, &new)?;
        state.replace(new.clone())?;
        sink.push(new)
    }

    fn execute_upsert(
        &self,
        _txn: Option<&Transaction>,
        space: &Space,
        request: &RowRequest,
        _sink: &mut dyn RowSink,
    ) -> Result<()> {
        let state = self.engine.space_state(space.id())?;
        let new = Self::decode_row(request)?;
        let key = state.primary().key_def().extract_key(&new)?;
        match state.primary().get(&key) {
            Some(existing) => {
                let updated = Self::apply_ops(&existing, &request.ops)?;
                Self::check_primary_key_unchanged(&state, space, &existing, &updated)?;
                state.replace(updated)?;
            }
            None => {
                state.replace(new)?;
            }
        }
        // Upsert emits nothing.
        Ok(())
    }
}
