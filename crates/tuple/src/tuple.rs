//! Reference-counted row handles

use crate::Value;
use std::sync::Arc;

/// A handle to one row's field values.
///
/// Cloning a tuple bumps a reference count instead of copying the row;
/// the row's storage is released when the last handle is dropped. Scopes
/// that fetch a tuple therefore release it on every exit path without any
/// explicit free call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    fields: Arc<[Value]>,
}

impl Tuple {
    pub fn new(fields: Vec<Value>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    /// Field by zero-based position.
    pub fn field(&self, index: u32) -> Option<&Value> {
        self.fields.get(index as usize)
    }

    pub fn field_count(&self) -> u32 {
        self.fields.len() as u32
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Number of live handles to this row. Test observability hook.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.fields)
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(fields: Vec<Value>) -> Self {
        Tuple::new(fields)
    }
}
