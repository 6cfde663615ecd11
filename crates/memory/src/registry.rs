//! Layer registry: maps each [`MemoryLayer`] to the source answering for it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use recall_core::layer::{LayerSource, MemoryLayer};
use tracing::debug;

use crate::file_backend::JsonlLayer;

/// Registered layer sources, at most one per layer.
#[derive(Default, Clone)]
pub struct LayerRegistry {
    sources: HashMap<MemoryLayer, Arc<dyn LayerSource>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a [`JsonlLayer`] for every layer, reading
    /// `<dir>/<layer>.jsonl`.
    pub fn from_dir(dir: &Path, max_results_per_layer: usize) -> Self {
        let mut registry = Self::new();
        for layer in MemoryLayer::ALL {
            registry.register(Arc::new(
                JsonlLayer::in_dir(layer, dir).with_limit(max_results_per_layer),
            ));
        }
        debug!(dir = %dir.display(), "Registered file-backed layers");
        registry
    }

    /// Register a source under the layer it reports. Replaces any previous
    /// source for that layer.
    pub fn register(&mut self, source: Arc<dyn LayerSource>) -> &mut Self {
        self.sources.insert(source.layer(), source);
        self
    }

    pub fn get(&self, layer: MemoryLayer) -> Option<Arc<dyn LayerSource>> {
        self.sources.get(&layer).cloned()
    }

    pub fn contains(&self, layer: MemoryLayer) -> bool {
        self.sources.contains_key(&layer)
    }

    /// Registered layers in canonical order.
    pub fn layers(&self) -> Vec<MemoryLayer> {
        MemoryLayer::ALL
            .into_iter()
            .filter(|l| self.sources.contains_key(l))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("layers", &self.layers())
            .finish()
    }
}
