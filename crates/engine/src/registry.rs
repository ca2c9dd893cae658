//! Process-wide engine directory
//!
//! The registry is append-only after start-up, which is what makes it
//! safe to read concurrently without locking during normal operation.
//! Every fan-out in this layer iterates it in registration order.

use crate::engine::Engine;
use keel_common::{Error, Result};
use std::sync::Arc;

struct EngineEntry {
    id: u32,
    engine: Arc<dyn Engine>,
}

/// Ordered directory of registered engines.
#[derive(Default)]
pub struct EngineRegistry {
    engines: Vec<EngineEntry>,
    next_id: u32,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
            next_id: 0,
        }
    }

    /// Append an engine and assign it the next integer id.
    ///
    /// Ids are strictly increasing in registration order and never
    /// reused. Names are not de-duplicated here: registering two engines
    /// under one name is a caller error and will break `find`.
    pub fn register(&mut self, engine: Arc<dyn Engine>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        tracing::debug!("registered engine '{}' with id {}", engine.name(), id);
        self.engines.push(EngineEntry { id, engine });
        id
    }

    /// Find an engine by name: linear scan in registration order.
    pub fn find(&self, name: &str) -> Result<Arc<dyn Engine>> {
        for entry in &self.engines {
            if entry.engine.name() == name {
                return Ok(Arc::clone(&entry.engine));
            }
        }
        Err(Error::no_such_engine(name))
    }

    /// Engines in registration order.
    pub fn engines(&self) -> impl Iterator<Item = &Arc<dyn Engine>> {
        self.engines.iter().map(|entry| &entry.engine)
    }

    /// `(id, engine)` pairs in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &Arc<dyn Engine>)> {
        self.engines.iter().map(|entry| (entry.id, &entry.engine))
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Run one-time setup on every engine in registration order. The
    /// first failure propagates and is fatal to process start-up.
    pub fn init_all(&self) -> Result<()> {
        for entry in &self.engines {
            entry
                .engine
                .init()
                .map_err(|e| Error::engine_failure(entry.engine.name(), e.to_string()))?;
        }
        Ok(())
    }

    /// Tear down every registered engine exactly once. Safe to call only
    /// once, at process teardown; the registry is empty afterwards.
    pub fn shutdown(&mut self) {
        for entry in self.engines.drain(..) {
            tracing::debug!("shutting down engine '{}'", entry.engine.name());
        }
        // next_id is deliberately not reset: ids are never reused.
    }
}
