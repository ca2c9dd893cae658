//! Filesystem-based checkpoint-artifact storage implementation

use keel_common::CheckpointId;
use keel_snapshot::{SnapshotMetadata, SnapshotStore, now_millis};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Filesystem-based artifact store
///
/// Artifacts are stored as `<engine>-<id>.snap` data files with
/// `<engine>-<id>.meta` JSON sidecars; the metadata index is rebuilt from
/// the sidecars on open, so the store survives process restart.
pub struct FileSnapshotStore {
    /// Base directory for storing artifacts
    base_path: PathBuf,
    /// In-memory index of metadata per engine
    index: RwLock<HashMap<String, BTreeMap<CheckpointId, SnapshotMetadata>>>,
}

impl FileSnapshotStore {
    /// Create a new file-based artifact store
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, String> {
        let base_path = base_path.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        fs::create_dir_all(&base_path)
            .map_err(|e| format!("Failed to create snapshot directory: {}", e))?;

        // Load existing metadata from disk
        let index = Self::load_index_from_disk(&base_path)?;

        Ok(Self {
            base_path,
            index: RwLock::new(index),
        })
    }

    fn data_file(&self, engine: &str, checkpoint_id: CheckpointId) -> PathBuf {
        self.base_path
            .join(format!("{}-{:020}.snap", engine, checkpoint_id))
    }

    fn meta_file(&self, engine: &str, checkpoint_id: CheckpointId) -> PathBuf {
        self.base_path
            .join(format!("{}-{:020}.meta", engine, checkpoint_id))
    }

    /// Load all sidecar metadata from disk
    fn load_index_from_disk(
        base_path: &Path,
    ) -> Result<HashMap<String, BTreeMap<CheckpointId, SnapshotMetadata>>, String> {
        let mut index: HashMap<String, BTreeMap<CheckpointId, SnapshotMetadata>> = HashMap::new();

        if let Ok(entries) = fs::read_dir(base_path) {
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) == Some("meta")
                    && let Ok(contents) = fs::read_to_string(&path)
                    && let Ok(metadata) = serde_json::from_str::<SnapshotMetadata>(&contents)
                {
                    index
                        .entry(metadata.engine.clone())
                        .or_default()
                        .insert(metadata.checkpoint_id, metadata);
                }
            }
        }

        Ok(index)
    }

    fn delete_files(&self, engine: &str, checkpoint_id: CheckpointId) {
        let _ = fs::remove_file(self.data_file(engine, checkpoint_id));
        let _ = fs::remove_file(self.meta_file(engine, checkpoint_id));
    }
}

impl SnapshotStore for FileSnapshotStore {
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

        fs::write(self.data_file(engine, checkpoint_id), &data)
            .map_err(|e| format!("Failed to write artifact: {}", e))?;
        let contents = serde_json::to_string(&metadata)
            .map_err(|e| format!("Failed to encode metadata: {}", e))?;
        fs::write(self.meta_file(engine, checkpoint_id), contents)
            .map_err(|e| format!("Failed to write metadata: {}", e))?;

        let mut index = self.index.write().map_err(|e| e.to_string())?;
        index
            .entry(engine.to_string())
            .or_default()
            .insert(checkpoint_id, metadata);
        Ok(())
    }

    fn latest_at_or_before(
        &self,
        engine: &str,
        checkpoint_id: CheckpointId,
    ) -> Option<(SnapshotMetadata, Vec<u8>)> {
        let metadata = {
            let index = self.index.read().ok()?;
            index
                .get(engine)?
                .range(..=checkpoint_id)
                .next_back()
                .map(|(_, metadata)| metadata.clone())?
        };
        let data = fs::read(self.data_file(engine, metadata.checkpoint_id)).ok()?;
        Some((metadata, data))
    }

    fn list(&self, engine: &str) -> Vec<SnapshotMetadata> {
        let Ok(index) = self.index.read() else {
            return Vec::new();
        };
        match index.get(engine) {
            Some(per_engine) => per_engine.values().rev().cloned().collect(),
            None => Vec::new(),
        }
    }

    fn remove(&self, engine: &str, checkpoint_id: CheckpointId) -> Result<(), String> {
        let mut index = self.index.write().map_err(|e| e.to_string())?;
        if let Some(per_engine) = index.get_mut(engine) {
            per_engine.remove(&checkpoint_id);
        }
        self.delete_files(engine, checkpoint_id);
        Ok(())
    }

    fn prune_older_than(&self, engine: &str, checkpoint_id: CheckpointId) -> Result<(), String> {
        let stale: Vec<CheckpointId> = {
            let index = self.index.read().map_err(|e| e.to_string())?;
            match index.get(engine) {
                Some(per_engine) => per_engine.range(..checkpoint_id).map(|(id, _)| *id).collect(),
                None => Vec::new(),
            }
        };
        for id in stale {
            self.remove(engine, id)?;
        }
        Ok(())
    }
}
