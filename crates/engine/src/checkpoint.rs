//! Two-phase, all-engines checkpoint coordination
//!
//! A checkpoint is global: either every engine's artifact for the id is
//! durably committed, or every engine is asked to abort. The begin/wait
//! split lets an engine's snapshot work run off the critical section,
//! between its `begin_checkpoint` returning and its `wait_checkpoint`
//! being called, while the coordinator still only commits once every
//! engine is confirmed durable.

use crate::registry::EngineRegistry;
use keel_common::{CheckpointId, Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Coordinates checkpoint attempts across every registered engine.
///
/// Owns the process-wide in-progress flag and the schema-wide lock. The
/// registry is passed in explicitly, so independent registries can be
/// checkpointed in one process.
#[derive(Default)]
pub struct CheckpointCoordinator {
    in_progress: AtomicBool,
    schema_lock: Mutex<()>,
}

impl CheckpointCoordinator {
    pub fn new() -> Self {
        Self {
            in_progress: AtomicBool::new(false),
            schema_lock: Mutex::new(()),
        }
    }

    /// True while a checkpoint attempt is in flight.
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Drive checkpoint `id` across every registered engine.
    ///
    /// At most one checkpoint is in flight at a time; a concurrent
    /// attempt fails with `AlreadyInProgress` without touching any
    /// engine. On any begin/wait failure every engine receives
    /// `abort_checkpoint` as a best-effort undo and the first observed
    /// failure propagates. The in-progress flag is cleared and the
    /// schema lock released on every exit path.
    pub fn checkpoint(&self, registry: &EngineRegistry, id: CheckpointId) -> Result<()> {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInProgress);
        }
        // Serialize against concurrent schema mutation for the whole
        // attempt.
        let schema_guard = self.schema_lock.lock();
        tracing::info!("beginning checkpoint {}", id);

        let result = Self::run_phases(registry, id);
        match &result {
            Ok(()) => tracing::info!("checkpoint {} committed", id),
            Err(err) => {
                tracing::warn!("checkpoint {} failed: {}; aborting on all engines", id, err);
                // Best-effort undo on every engine, even those the begin
                // phase never reached; abort without a matching begin is
                // a no-op by contract.
                for engine in registry.engines() {
                    engine.abort_checkpoint();
                }
            }
        }

        drop(schema_guard);
        self.in_progress.store(false, Ordering::Release);
        result
    }

    fn run_phases(registry: &EngineRegistry, id: CheckpointId) -> Result<()> {
        // Begin phase: stop issuing begins at the first refusal.
        for engine in registry.engines() {
            tracing::debug!("begin checkpoint {} on engine '{}'", id, engine.name());
            engine
                .begin_checkpoint(id)
                .map_err(|e| Error::engine_failure(engine.name(), e.to_string()))?;
        }

        // Wait phase: block until every snapshot is durable.
        for engine in registry.engines() {
            engine
                .wait_checkpoint()
                .map_err(|e| Error::engine_failure(engine.name(), e.to_string()))?;
        }

        // Commit phase: drop previous snapshot references. Failures here
        // are not representable and not compensated.
        for engine in registry.engines() {
            engine.commit_checkpoint();
        }
        Ok(())
    }
}
