//! Row and key primitives for the keel storage-engine layer
//!
//! This crate provides:
//! - `Value`: one typed field of a row
//! - `Tuple`: a reference-counted handle to one row
//! - `codec`: a sortable tagged binary encoding for values and packed keys
//! - `KeyDef`: an index's key description, with extraction, validation and
//!   typed/partial comparison against an unpacked key

pub mod codec;
mod key;
mod tuple;
mod value;

pub use key::{FieldType, KeyDef, KeyPart};
pub use tuple::Tuple;
pub use value::Value;
