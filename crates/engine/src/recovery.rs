//! Start-up recovery fan-out

use crate::registry::EngineRegistry;
use keel_common::{CheckpointId, Error, Result};

/// Replay the newest durable checkpoint with id <= `checkpoint_id` on
/// every engine, in registration order. The first failure propagates and
/// is fatal to process start-up.
pub fn recover_to_checkpoint(
    registry: &EngineRegistry,
    checkpoint_id: CheckpointId,
) -> Result<()> {
    tracing::info!("recovering all engines to checkpoint {}", checkpoint_id);
    for engine in registry.engines() {
        engine
            .recover_to_checkpoint(checkpoint_id)
            .map_err(|e| Error::engine_failure(engine.name(), e.to_string()))?;
    }
    Ok(())
}

/// Recovery is complete: let every engine switch from recovery-time
/// behavior (e.g. deferred secondary-key builds) to normal operation.
pub fn end_recovery(registry: &EngineRegistry) -> Result<()> {
    for engine in registry.engines() {
        engine
            .end_recovery()
            .map_err(|e| Error::engine_failure(engine.name(), e.to_string()))?;
    }
    Ok(())
}
