//! Index key definitions
//!
//! A key definition names which row fields form an index's comparison key.
//! Parts may reference fields out of storage order and non-adjacently
//! (e.g. logical order field 4, field 1, field 2); extraction and
//! comparison follow the declared part order, not the row layout.

use crate::{Tuple, Value};
use keel_common::{Error, IteratorType, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Declared type of one key part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Unsigned,
    Integer,
    String,
    Bytes,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Unsigned => "unsigned",
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
        }
    }

    /// Whether a value inhabits this type.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Unsigned, Value::Unsigned(_))
                | (FieldType::Integer, Value::Integer(_))
                | (FieldType::String, Value::String(_))
                | (FieldType::Bytes, Value::Bytes(_))
        )
    }
}

/// One part of an index key: a row field position plus its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    pub field_no: u32,
    pub field_type: FieldType,
}

impl KeyPart {
    pub fn new(field_no: u32, field_type: FieldType) -> Self {
        Self {
            field_no,
            field_type,
        }
    }
}

/// Ordered description of an index's comparison key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    parts: Vec<KeyPart>,
}

impl KeyDef {
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Full arity of the key.
    pub fn part_count(&self) -> u32 {
        self.parts.len() as u32
    }

    /// Pull this key's values out of a row, in declared part order.
    ///
    /// Fails when the row is too short for a part or a field's type does
    /// not match the declaration.
    pub fn extract_key(&self, tuple: &Tuple) -> Result<Vec<Value>> {
        let mut key = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let value = tuple.field(part.field_no).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Tuple has {} fields, key part references field {}",
                    tuple.field_count(),
                    part.field_no
                ))
            })?;
            if !part.field_type.matches(value) {
                return Err(Error::invalid_argument(format!(
                    "Tuple field {} must be {}, got {}",
                    part.field_no,
                    part.field_type.name(),
                    value.type_name()
                )));
            }
            key.push(value.clone());
        }
        Ok(key)
    }

    /// Validate a search key against this definition and a scan mode.
    ///
    /// A key shorter than the full arity is valid for range modes but not
    /// for exact match; zero parts means "no key". Enforced here so that
    /// iterators never see an incompatible key.
    pub fn validate_key(&self, key: &[Value], iterator: IteratorType) -> Result<()> {
        let arity = self.parts.len();
        if key.len() > arity {
            return Err(Error::invalid_argument(format!(
                "Key has {} parts, index expects at most {}",
                key.len(),
                arity
            )));
        }
        if iterator == IteratorType::Eq && key.len() < arity {
            return Err(Error::invalid_argument(format!(
                "Exact-match iterator requires a full key: got {} of {} parts",
                key.len(),
                arity
            )));
        }
        for (i, (part, value)) in self.parts.iter().zip(key).enumerate() {
            if !part.field_type.matches(value) {
                return Err(Error::invalid_argument(format!(
                    "Key part {} must be {}, got {}",
                    i,
                    part.field_type.name(),
                    value.type_name()
                )));
            }
        }
        Ok(())
    }

    /// Compare a row against a possibly partial unpacked key.
    ///
    /// Only the supplied key parts participate; a row matching every
    /// supplied part compares equal.
    pub fn compare_with_key(&self, tuple: &Tuple, key: &[Value]) -> Result<Ordering> {
        let extracted = self.extract_key(tuple)?;
        for (row_value, key_value) in extracted.iter().zip(key) {
            match row_value.cmp(key_value) {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }
}
