//! Pluggable storage-engine layer for a transactional database kernel
//!
//! This crate is the contract that lets physically different storage
//! back-ends be driven through one uniform interface for row access,
//! transaction lifecycle, schema maintenance, checkpointing and replica
//! bootstrap.
//!
//! ## Architecture
//!
//! The layer handles:
//! - The generic, engine-agnostic select path (iterator-driven row
//!   retrieval with typed key validation and offset/limit semantics)
//! - Registration-ordered fan-out of lifecycle events over all engines
//! - Two-phase, all-engines checkpoint coordination
//! - Replica-join and recovery fan-out
//!
//! Storage engines provide:
//! - Row mutation against their own storage
//! - Index implementations behind the `Index`/`RowIterator` seam
//! - Their side of the checkpoint protocol
//! - Streaming their rows to a joining replica

pub mod checkpoint;
pub mod engine;
pub mod handler;
pub mod join;
pub mod recovery;
pub mod registry;
pub mod request;
pub mod space;
pub mod transaction;

pub use checkpoint::CheckpointCoordinator;
pub use engine::Engine;
pub use handler::{BaseHandler, Handler};
pub use join::JoinRelay;
pub use registry::EngineRegistry;
pub use request::{RowBuffer, RowRequest, RowSink, UpdateOp};
pub use space::{Index, RowIterator, Space, SpaceDef};
pub use transaction::{Statement, Transaction};
