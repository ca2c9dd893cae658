//! Replica-join fan-out
//!
//! A join is a full-data bootstrap for a newly joining replica: every
//! engine streams its own rows over the replica channel. Fan-out is
//! sequential in registration order with no failure aggregation; the
//! first failure propagates.

use crate::registry::EngineRegistry;
use keel_common::{Error, Result, SpaceId};
use keel_tuple::Tuple;

/// Replica-facing channel a joining engine streams rows into.
pub trait JoinRelay: Send {
    fn send_row(&mut self, space_id: SpaceId, row: Tuple) -> Result<()>;
}

/// Prepare every engine for a full-data read, in registration order.
pub fn begin_join(registry: &EngineRegistry) -> Result<()> {
    for engine in registry.engines() {
        engine
            .begin_join()
            .map_err(|e| Error::engine_failure(engine.name(), e.to_string()))?;
    }
    Ok(())
}

/// Stream every engine's rows to the joining replica, in registration
/// order.
pub fn join(registry: &EngineRegistry, relay: &mut dyn JoinRelay) -> Result<()> {
    for engine in registry.engines() {
        tracing::debug!("join: streaming rows from engine '{}'", engine.name());
        engine
            .join(relay)
            .map_err(|e| Error::engine_failure(engine.name(), e.to_string()))?;
    }
    Ok(())
}
