//! Routing outcome types: one [`LayerResult`] per consulted layer, gathered
//! into a [`RoutingResult`].

use serde::{Deserialize, Serialize};

use crate::classification::ClassificationResult;
use crate::error::LayerError;
use crate::item::MemoryItem;
use crate::layer::MemoryLayer;

/// Outcome of querying one layer for one query.
///
/// `items` is `None` exactly when `error` is set. Use [`LayerResult::success`]
/// and [`LayerResult::failure`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerResult {
    pub layer: MemoryLayer,
    pub items: Option<Vec<MemoryItem>>,
    pub elapsed_ms: u64,
    pub weight: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LayerError>,
}

impl LayerResult {
    pub fn success(layer: MemoryLayer, items: Vec<MemoryItem>, elapsed_ms: u64, weight: f32) -> Self {
        Self {
            layer,
            items: Some(items),
            elapsed_ms,
            weight,
            error: None,
        }
    }

    pub fn failure(error: LayerError, elapsed_ms: u64, weight: f32) -> Self {
        Self {
            layer: error.layer(),
            items: None,
            elapsed_ms,
            weight,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }
}

/// Timing and bookkeeping for one `route()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingStats {
    pub total_time_ms: u64,
    pub classification_ms: u64,
    pub layers_queried: usize,
    pub layers_failed: usize,
    pub cache_hit: bool,
}

/// Everything the router learned about a query.
///
/// `results.len() == classification.layers.len()` and `results[i].layer ==
/// classification.layers[i]` always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub query: String,
    pub classification: ClassificationResult,
    pub results: Vec<LayerResult>,
    pub stats: RoutingStats,
}

impl RoutingResult {
    /// Total raw items across successful layers.
    pub fn total_items(&self) -> usize {
        self.results.iter().map(LayerResult::item_count).sum()
    }

    pub fn failed_layers(&self) -> impl Iterator<Item = &LayerResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }
}
