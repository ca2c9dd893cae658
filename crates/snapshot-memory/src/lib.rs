//! In-memory checkpoint-artifact storage implementation

use keel_common::CheckpointId;
use keel_snapshot::{SnapshotMetadata, SnapshotStore, now_millis};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// In-memory artifact store for testing
pub struct MemorySnapshotStore {
    // engine -> checkpoint id -> (metadata, data)
    artifacts: RwLock<HashMap<String, BTreeMap<CheckpointId, (SnapshotMetadata, Vec<u8>)>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            artifacts: RwLock::new(HashMap::new()),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(
        &self,
        engine: &str,
        checkpoint_id: CheckpointId,
        data: Vec<u8>,
    ) -> Result<(), String> {
        let metadata = SnapshotMetadata {
            engine: engine.to_string(),
            checkpoint_id,
            size_bytes: data.len() as u64,
            created_at: now_millis(),
        };
        let mut artifacts = self.artifacts.write().map_err(|e| e.to_string())?;
        artifacts
            .entry(engine.to_string())
            .or_default()
            .insert(checkpoint_id, (metadata, data));
        Ok(())
    }

    fn latest_at_or_before(
        &self,
        engine: &str,
        checkpoint_id: CheckpointId,
    ) -> Option<(SnapshotMetadata, Vec<u8>)> {
        let artifacts = self.artifacts.read().ok()?;
        let per_engine = artifacts.get(engine)?;
        per_engine
            .range(..=checkpoint_id)
            .next_back()
            .map(|(_, entry)| entry.clone())
    }

    fn list(&self, engine: &str) -> Vec<SnapshotMetadata> {
        let Ok(artifacts) = self.artifacts.read() else {
            return Vec::new();
        };
        match artifacts.get(engine) {
            Some(per_engine) => per_engine
                .values()
                .rev()
                .map(|(metadata, _)| metadata.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    fn remove(&self, engine: &str, checkpoint_id: CheckpointId) -> Result<(), String> {
        let mut artifacts = self.artifacts.write().map_err(|e| e.to_string())?;
        if let Some(per_engine) = artifacts.get_mut(engine) {
            per_engine.remove(&checkpoint_id);
        }
        Ok(())
    }

    fn prune_older_than(&self, engine: &str, checkpoint_id: CheckpointId) -> Result<(), String> {
        let mut artifacts = self.artifacts.write().map_err(|e| e.to_string())?;
        if let Some(per_engine) = artifacts.get_mut(engine) {
            per_engine.retain(|id, _| *id >= checkpoint_id);
        }
        Ok(())
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
