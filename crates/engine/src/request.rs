//! Row requests and result sinks
//!
//! A `RowRequest` is the wire-shaped input of every row operation; a
//! `RowSink` is the append-only destination emitted rows go to. The core
//! only requires the "append one row" capability of a sink.

use keel_common::{IndexId, IteratorType, Result};
use keel_tuple::{Tuple, Value, codec};
use serde::{Deserialize, Serialize};

/// Row-access request as submitted by the query executor.
#[derive(Debug, Clone)]
pub struct RowRequest {
    /// Target index within the space.
    pub index_id: IndexId,
    /// Iterator-type code; see `IteratorType::from_code`.
    pub iterator: u32,
    /// Packed search key, absent meaning "no key".
    pub key: Option<Vec<u8>>,
    /// Packed row payload for replace/upsert.
    pub tuple: Option<Vec<u8>>,
    /// Field assignments for update/upsert.
    pub ops: Vec<UpdateOp>,
    /// Rows to skip before emitting.
    pub offset: u32,
    /// Maximum rows to emit; `u32::MAX` means unbounded.
    pub limit: u32,
}

impl RowRequest {
    /// A select request over an index; unbounded unless narrowed.
    pub fn select(index_id: IndexId, iterator: IteratorType) -> Self {
        Self {
            index_id,
            iterator: iterator.code(),
            key: None,
            tuple: None,
            ops: Vec::new(),
            offset: 0,
            limit: u32::MAX,
        }
    }

    /// A mutation request carrying a full row payload.
    pub fn write(row: &[Value]) -> Self {
        Self {
            index_id: 0,
            iterator: IteratorType::Eq.code(),
            key: None,
            tuple: Some(codec::encode_packed(row)),
            ops: Vec::new(),
            offset: 0,
            limit: u32::MAX,
        }
    }

    pub fn with_key(mut self, parts: &[Value]) -> Self {
        self.key = Some(codec::encode_packed(parts));
        self
    }

    pub fn with_tuple(mut self, row: &[Value]) -> Self {
        self.tuple = Some(codec::encode_packed(row));
        self
    }

    pub fn with_ops(mut self, ops: Vec<UpdateOp>) -> Self {
        self.ops = ops;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// One field assignment applied by update/upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOp {
    pub field_no: u32,
    pub value: Value,
}

impl UpdateOp {
    pub fn assign(field_no: u32, value: Value) -> Self {
        Self { field_no, value }
    }
}

/// Append-only destination for rows produced by a row operation.
pub trait RowSink {
    fn push(&mut self, row: Tuple) -> Result<()>;
}

/// Sink collecting rows into memory.
#[derive(Debug, Default)]
pub struct RowBuffer {
    rows: Vec<Tuple>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Tuple> {
        self.rows
    }
}

impl RowSink for RowBuffer {
    fn push(&mut self, row: Tuple) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }
}
