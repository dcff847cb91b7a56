//! In-memory pipeline registry.

use super::PipelineConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct RegistryInner {
    pipelines: HashMap<String, Arc<PipelineConfig>>,
    order: Vec<String>,
}

/// Holds pipeline definitions by id.
///
/// Registering an id that already exists replaces the previous definition
/// without error. Executions already running keep the definition they
/// started with.
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    inner: RwLock<RegistryInner>,
}

impl PipelineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a pipeline and returns the shared definition.
    pub fn register(&self, config: PipelineConfig) -> Arc<PipelineConfig> {
        let config = Arc::new(config);
        let mut inner = self.inner.write();

        let replaced = inner
            .pipelines
            .insert(config.id.clone(), Arc::clone(&config))
            .is_some();
        if replaced {
            debug!(pipeline_id = %config.id, "Replaced existing pipeline definition");
        } else {
            inner.order.push(config.id.clone());
        }

        info!(pipeline_id = %config.id, name = %config.name, "Registered pipeline");
        config
    }

    /// Looks up a pipeline.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<PipelineConfig>> {
        self.inner.read().pipelines.get(id).cloned()
    }

    /// Lists pipelines in first-registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<PipelineConfig>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.pipelines.get(id).cloned())
            .collect()
    }

    /// Returns the number of registered pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().pipelines.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().pipelines.is_empty()
    }
}
