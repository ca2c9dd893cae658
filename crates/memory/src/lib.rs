//! Reference in-memory tree engine
//!
//! Rows live in ordered-tree indexes keyed by their sortable-encoded key.
//! The engine implements the full checkpoint protocol against a
//! `SnapshotStore`, recovers from stored artifacts, and streams its rows
//! to joining replicas. Its handler overrides every mutating row
//! operation and keeps all indexes of a space consistent.

pub mod engine;
pub mod handler;
pub mod index;
mod space;

pub use engine::MemoryEngine;
pub use handler::MemoryHandler;
pub use index::TreeIndex;
