//! The storage-engine capability interface
//!
//! One `Engine` instance represents one storage back-end. Every hook an
//! engine may not care about carries a safe default, so a minimal engine
//! implements `name` and `open` and nothing else. Hooks are always invoked
//! sequentially, never concurrently for the same transaction or
//! checkpoint.

use crate::handler::Handler;
use crate::join::JoinRelay;
use crate::space::Space;
use crate::transaction::{Statement, Transaction};
use keel_common::{CheckpointId, Error, Result};
use std::sync::Arc;

/// A storage back-end registered once at process start-up.
pub trait Engine: Send + Sync {
    /// Unique engine name, used for registry lookup and diagnostics.
    fn name(&self) -> &str;

    /// Create the per-space execution facade bound to this engine.
    fn open(self: Arc<Self>) -> Box<dyn Handler>;

    /// One-time setup after registration, before first use. Failure is
    /// fatal to process start-up.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Populate a reserved system space at bootstrap. An engine that
    /// supports system spaces must override this.
    fn init_system_space(&self, space: &Space) -> Result<()> {
        let _ = space;
        Err(Error::unsupported(self.name(), "init_system_space"))
    }

    /// A primary index was added to one of this engine's spaces.
    fn add_primary_key(&self, _space: &Space) -> Result<()> {
        Ok(())
    }

    /// A primary index was removed from one of this engine's spaces.
    fn drop_primary_key(&self, _space: &Space) -> Result<()> {
        Ok(())
    }

    /// Whether a freshly added secondary index must be populated from
    /// existing rows. Conservative by default.
    fn need_to_build_secondary_key(&self, _space: &Space) -> bool {
        true
    }

    /// A statement is about to execute against one of this engine's
    /// spaces.
    fn begin_statement(&self, _txn: &Transaction) -> Result<()> {
        Ok(())
    }

    /// First commit phase: validate and stage the transaction. Failure
    /// aborts that transaction only.
    fn prepare(&self, _txn: &Transaction) -> Result<()> {
        Ok(())
    }

    /// Second commit phase: make the transaction's effects durable.
    /// Infallible; validation belongs in `prepare`.
    fn commit(&self, _txn: &Transaction) {}

    /// Undo the whole transaction.
    fn rollback(&self, _txn: &Transaction) {}

    /// Undo a single statement.
    fn rollback_statement(&self, _stmt: &Statement) {}

    /// Start producing a snapshot for the given checkpoint id. The
    /// snapshot work may continue asynchronously after this returns.
    fn begin_checkpoint(&self, _checkpoint_id: CheckpointId) -> Result<()> {
        Ok(())
    }

    /// Block until the snapshot started by `begin_checkpoint` is durable.
    fn wait_checkpoint(&self) -> Result<()> {
        Ok(())
    }

    /// The checkpoint is durable everywhere: drop the reference to the
    /// previous snapshot. Infallible; an engine that cannot complete this
    /// surfaces the damage at recovery time instead.
    fn commit_checkpoint(&self) {}

    /// Best-effort undo of an in-flight checkpoint. Must be a no-op when
    /// no matching `begin_checkpoint` was received.
    fn abort_checkpoint(&self) {}

    /// Replay the newest durable checkpoint with id <= `checkpoint_id`
    /// at process start-up.
    fn recover_to_checkpoint(&self, _checkpoint_id: CheckpointId) -> Result<()> {
        Ok(())
    }

    /// Recovery is complete; switch to normal operation.
    fn end_recovery(&self) -> Result<()> {
        Ok(())
    }

    /// A replica is about to join; prepare for a full-data read.
    fn begin_join(&self) -> Result<()> {
        Ok(())
    }

    /// Stream every row this engine owns to a joining replica.
    fn join(&self, _relay: &mut dyn JoinRelay) -> Result<()> {
        Ok(())
    }

    /// Reclaim memory after a non-transactional read pass. Transactional
    /// reads piggy-back on commit/rollback cleanup instead.
    fn collect_garbage(&self) {}
}
