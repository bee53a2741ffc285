//! Registry mapping engine identifiers to configured engine instances.

use std::collections::HashMap;
use std::sync::Arc;

use super::{EngineError, SearchEngine};

bitflags::bitflags! {
    /// Operations an engine supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EngineCapabilities: u32 {
        const SEARCH = 1 << 0;
        const GET = 1 << 1;
        const DATABASE_INFO = 1 << 2;
    }
}

/// Holds every configured engine, keyed by [`SearchEngine::id`].
///
/// The registry is an explicit value: construct one at your composition
/// point and pass it down. It is populated at startup (`register` takes
/// `&mut self`) and read concurrently afterwards: lookups borrow
/// immutably, and the `Arc`'d engines are `Send + Sync`.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn SearchEngine>>,
}

impl EngineRegistry {
    /// An empty registry. Engines need per-deployment credentials, so
    /// nothing is pre-registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its id, replacing any previous engine with
    /// the same id.
    pub fn register(&mut self, engine: Arc<dyn SearchEngine>) {
        self.engines.insert(engine.id().to_string(), engine);
    }

    /// Look up an engine by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn SearchEngine>> {
        self.engines.get(id)
    }

    /// Look up an engine by id, failing with a configuration error when
    /// nothing is registered under it.
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn SearchEngine>, EngineError> {
        self.get(id)
            .ok_or_else(|| EngineError::Configuration(format!("no engine registered as '{}'", id)))
    }

    /// Drop all registrations. Used to isolate test runs.
    pub fn reset(&mut self) {
        self.engines.clear();
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn SearchEngine>> {
        self.engines.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(|s| s.as_str())
    }

    /// Engines supporting every capability in `capability`.
    pub fn with_capability(&self, capability: EngineCapabilities) -> Vec<&Arc<dyn SearchEngine>> {
        self.all()
            .filter(|e| e.capabilities().contains(capability))
            .collect()
    }

    pub fn searchable(&self) -> Vec<&Arc<dyn SearchEngine>> {
        self.with_capability(EngineCapabilities::SEARCH)
    }

    pub fn has(&self, id: &str) -> bool {
        self.engines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
