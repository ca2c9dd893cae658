//! The in-memory tree engine
//!
//! All durable behavior goes through an injected `SnapshotStore`:
//! `begin_checkpoint` serializes a consistent dump of every space and
//! parks it as pending, `wait_checkpoint` writes it to the store,
//! `commit_checkpoint` prunes superseded artifacts, and recovery rebuilds
//! every index from the newest artifact at or below the requested id.

use crate::handler::MemoryHandler;
use crate::index::TreeIndex;
use crate::space::MemorySpace;
use keel_common::{CheckpointId, Error, IndexId, Result, SpaceId, TransactionId};
use keel_engine::{Engine, Handler, Index, JoinRelay, Space, SpaceDef, Statement, Transaction};
use keel_snapshot::SnapshotStore;
use keel_tuple::{KeyDef, Tuple, Value};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Serialize, Deserialize)]
struct SpaceDump {
    space_id: SpaceId,
    rows: Vec<Vec<Value>>,
}

#[derive(Serialize, Deserialize)]
struct EngineDump {
    spaces: Vec<SpaceDump>,
}

struct PendingCheckpoint {
    id: CheckpointId,
    data: Vec<u8>,
    /// Whether wait_checkpoint already wrote the artifact to the store.
    durable: bool,
}

/// In-memory ordered-tree storage engine.
pub struct MemoryEngine {
    name: String,
    spaces: RwLock<BTreeMap<SpaceId, Arc<MemorySpace>>>,
    snapshots: Arc<dyn SnapshotStore>,
    pending_checkpoint: Mutex<Option<PendingCheckpoint>>,
    active_transactions: Mutex<HashSet<TransactionId>>,
    /// Engines start in recovery mode until the kernel signals the end of
    /// recovery.
    recovering: AtomicBool,
}

impl MemoryEngine {
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            name: "memory".to_string(),
            spaces: RwLock::new(BTreeMap::new()),
            snapshots,
            pending_checkpoint: Mutex::new(None),
            active_transactions: Mutex::new(HashSet::new()),
            recovering: AtomicBool::new(true),
        }
    }

    /// Create a space with its indexes. An index with id 0 (the primary
    /// key) must be present; index ids must be unique.
    ///
    /// Returns the kernel-facing `Space` sharing this engine's index
    /// objects.
    pub fn create_space(
        &self,
        def: SpaceDef,
        indexes: Vec<(IndexId, String, KeyDef)>,
    ) -> Result<Arc<Space>> {
        let mut indexes = indexes;
        indexes.sort_by_key(|(id, _, _)| *id);
        match indexes.first() {
            Some((0, _, _)) => {}
            _ => {
                return Err(Error::invalid_argument(format!(
                    "Space '{}' needs a primary index (id 0)",
                    def.name
                )));
            }
        }
        if indexes.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(Error::invalid_argument(format!(
                "Space '{}' declares duplicate index ids",
                def.name
            )));
        }

        let mut spaces = self.spaces.write();
        if spaces.contains_key(&def.id) {
            return Err(Error::invalid_argument(format!(
                "Space {} already exists in engine '{}'",
                def.id, self.name
            )));
        }

        let tree_indexes: Vec<Arc<TreeIndex>> = indexes
            .into_iter()
            .map(|(id, name, key_def)| Arc::new(TreeIndex::new(id, name, key_def)))
            .collect();
        spaces.insert(
            def.id,
            Arc::new(MemorySpace {
                def: def.clone(),
                indexes: tree_indexes.clone(),
            }),
        );

        let dyn_indexes = tree_indexes
            .into_iter()
            .map(|index| index as Arc<dyn Index>)
            .collect();
        Ok(Arc::new(Space::new(def, dyn_indexes)))
    }

    /// Detach a space from this engine.
    pub fn drop_space(&self, space_id: SpaceId) -> Result<()> {
        self.spaces
            .write()
            .remove(&space_id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("space", space_id.to_string()))
    }

    pub(crate) fn space_state(&self, space_id: SpaceId) -> Result<Arc<MemorySpace>> {
        self.spaces
            .read()
            .get(&space_id)
            .cloned()
            .ok_or_else(|| Error::not_found("space", space_id.to_string()))
    }

    /// Serialize every space's rows, in primary-key order.
    fn dump(&self) -> Result<Vec<u8>> {
        let spaces = self.spaces.read();
        let mut dump = EngineDump {
            spaces: Vec::with_capacity(spaces.len()),
        };
        for (space_id, state) in spaces.iter() {
            let rows = state
                .primary()
                .all_rows()
                .iter()
                .map(|row| row.fields().to_vec())
                .collect();
            dump.spaces.push(SpaceDump {
                space_id: *space_id,
                rows,
            });
        }
        serde_json::to_vec(&dump)
            .map_err(|e| Error::engine_failure(&self.name, format!("Dump encoding failed: {}", e)))
    }

    /// Rebuild every index from a dump, replacing current contents.
    fn load_dump(&self, data: &[u8]) -> Result<()> {
        let dump: EngineDump = serde_json::from_slice(data)
            .map_err(|e| Error::engine_failure(&self.name, format!("Dump decoding failed: {}", e)))?;
        let spaces = self.spaces.read();
        for state in spaces.values() {
            state.clear();
        }
        for space_dump in dump.spaces {
            let state = spaces
                .get(&space_dump.space_id)
                .ok_or_else(|| Error::not_found("space", space_dump.space_id.to_string()))?;
            for fields in space_dump.rows {
                state.replace(Tuple::new(fields))?;
            }
        }
        Ok(())
    }
}

impl Engine for MemoryEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(self: Arc<Self>) -> Box<dyn Handler> {
        Box::new(MemoryHandler::new(self))
    }

    fn init(&self) -> Result<()> {
        tracing::debug!("memory engine initialized");
        Ok(())
    }

    fn init_system_space(&self, space: &Space) -> Result<()> {
        // System spaces are ordinary spaces here; they just must exist in
        // this engine and carry a primary key.
        self.space_state(space.id())?;
        space.primary_key()?;
        Ok(())
    }

    fn add_primary_key(&self, space: &Space) -> Result<()> {
        let index = space.primary_key()?;
        if index.key_def().parts().is_empty() {
            return Err(Error::invalid_argument(format!(
                "Primary key of space '{}' has no parts",
                space.name()
            )));
        }
        Ok(())
    }

    fn need_to_build_secondary_key(&self, _space: &Space) -> bool {
        // During recovery secondary keys are built in bulk afterwards.
        !self.recovering.load(Ordering::Acquire)
    }

    fn begin_statement(&self, txn: &Transaction) -> Result<()> {
        self.active_transactions.lock().insert(txn.id());
        Ok(())
    }

    fn prepare(&self, txn: &Transaction) -> Result<()> {
        if !self.active_transactions.lock().contains(&txn.id()) {
            return Err(Error::invalid_argument(format!(
                "Transaction {} not found",
                txn.id()
            )));
        }
        Ok(())
    }

    fn commit(&self, txn: &Transaction) {
        self.active_transactions.lock().remove(&txn.id());
    }

    fn rollback(&self, txn: &Transaction) {
        // Undo statements newest-first.
        for statement in txn.statements().iter().rev() {
            self.rollback_statement(statement);
        }
        self.active_transactions.lock().remove(&txn.id());
    }

    fn rollback_statement(&self, stmt: &Statement) {
        let Ok(state) = self.space_state(stmt.space_id) else {
            return;
        };
        if let Some(new) = &stmt.new_tuple {
            let _ = state.delete(new);
        }
        if let Some(old) = &stmt.old_tuple {
            let _ = state.replace(old.clone());
        }
    }

    fn begin_checkpoint(&self, checkpoint_id: CheckpointId) -> Result<()> {
        let mut pending = self.pending_checkpoint.lock();
        if pending.is_some() {
            return Err(Error::invalid_argument(
                "Checkpoint already begun on this engine",
            ));
        }
        let data = self.dump()?;
        *pending = Some(PendingCheckpoint {
            id: checkpoint_id,
            data,
            durable: false,
        });
        tracing::debug!("memory engine staged checkpoint {}", checkpoint_id);
        Ok(())
    }

    fn wait_checkpoint(&self) -> Result<()> {
        let mut pending = self.pending_checkpoint.lock();
        let Some(p) = pending.as_mut() else {
            return Err(Error::invalid_argument("No checkpoint in progress"));
        };
        self.snapshots
            .save(&self.name, p.id, p.data.clone())
            .map_err(|e| Error::engine_failure(&self.name, e))?;
        p.durable = true;
        Ok(())
    }

    fn commit_checkpoint(&self) {
        let Some(p) = self.pending_checkpoint.lock().take() else {
            return;
        };
        if let Err(e) = self.snapshots.prune_older_than(&self.name, p.id) {
            tracing::warn!("failed to prune superseded snapshots: {}", e);
        }
        tracing::info!("memory engine committed checkpoint {}", p.id);
    }

    fn abort_checkpoint(&self) {
        // No-op unless a matching begin was received.
        let Some(p) = self.pending_checkpoint.lock().take() else {
            return;
        };
        if p.durable
            && let Err(e) = self.snapshots.remove(&self.name, p.id)
        {
            tracing::warn!("failed to remove aborted snapshot {}: {}", p.id, e);
        }
        tracing::debug!("memory engine aborted checkpoint {}", p.id);
    }

    fn recover_to_checkpoint(&self, checkpoint_id: CheckpointId) -> Result<()> {
        let (metadata, data) = self
            .snapshots
            .latest_at_or_before(&self.name, checkpoint_id)
            .ok_or_else(|| Error::not_found("checkpoint", checkpoint_id.to_string()))?;
        tracing::info!(
            "recovering memory engine from checkpoint {}",
            metadata.checkpoint_id
        );
        self.load_dump(&data)
    }

    fn end_recovery(&self) -> Result<()> {
        self.recovering.store(false, Ordering::Release);
        Ok(())
    }

    fn join(&self, relay: &mut dyn JoinRelay) -> Result<()> {
        let spaces = self.spaces.read();
        for (space_id, state) in spaces.iter() {
            for row in state.primary().all_rows() {
                relay.send_row(*space_id, row)?;
            }
        }
        Ok(())
    }
}
