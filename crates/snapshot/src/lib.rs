//! Snapshot storage trait and types for checkpoint artifacts

use keel_common::CheckpointId;
use serde::{Deserialize, Serialize};

/// Metadata about a stored checkpoint artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Engine this artifact belongs to
    pub engine: String,
    /// Checkpoint id the artifact was written under
    pub checkpoint_id: CheckpointId,
    /// Size of artifact data in bytes
    pub size_bytes: u64,
    /// System time when the artifact was created (ms since epoch)
    pub created_at: u64,
}

/// Trait for checkpoint-artifact storage backends
pub trait SnapshotStore: Send + Sync {
    /// Save an artifact for an engine under a checkpoint id
    fn save(&self, engine: &str, checkpoint_id: CheckpointId, data: Vec<u8>)
    -> Result<(), String>;

    /// Get the newest artifact with checkpoint id <= the given id
    fn latest_at_or_before(
        &self,
        engine: &str,
        checkpoint_id: CheckpointId,
    ) -> Option<(SnapshotMetadata, Vec<u8>)>;

    /// List all artifacts for an engine (sorted by checkpoint id, newest first)
    fn list(&self, engine: &str) -> Vec<SnapshotMetadata>;

    /// Remove one artifact; removing a missing artifact is not an error
    fn remove(&self, engine: &str, checkpoint_id: CheckpointId) -> Result<(), String>;

    /// Delete artifacts older than the given checkpoint id
    fn prune_older_than(&self, engine: &str, checkpoint_id: CheckpointId) -> Result<(), String>;
}

/// Current system time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
