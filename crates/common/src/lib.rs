//! Common types for the keel storage-engine layer
//!
//! This crate defines:
//! - Identifier types shared by every crate in the workspace
//! - The iterator-type codes used on the row-request wire surface
//! - The typed error surface every public operation reports through

mod error;
mod ids;
mod iterator_type;

pub use error::{Error, Result};
pub use ids::{CheckpointId, IndexId, SpaceId, TransactionId};
pub use iterator_type::IteratorType;
