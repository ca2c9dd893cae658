//! Identifier types shared across the workspace

/// Numeric id of a space within the schema.
pub type SpaceId = u32;

/// Numeric id of an index within its space. The primary index is always 0.
pub type IndexId = u32;

/// Transaction identifier assigned by the kernel.
pub type TransactionId = u64;

/// Checkpoint identifier. Supplied by the checkpoint subsystem,
/// monotonically increasing; never generated by an engine.
pub type CheckpointId = u64;
