//! Memory router: classify, fan out to layers under a timeout, fan in,
//! cache.
//!
//! Each selected layer is queried concurrently and raced against its own
//! timeout. A layer that errors, panics, times out or has no registered
//! source yields a [`LayerResult`] carrying the error and no items; only
//! classification failure makes [`MemoryRouter::route`] fail.
//!
//! A timed-out layer future is dropped, which cancels it at its next
//! suspension point. Siblings are never blocked by it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use moka::sync::Cache;
use recall_config::RouterConfig;
use recall_core::classification::ClassificationResult;
use recall_core::error::{ClassificationError, LayerError};
use recall_core::layer::MemoryLayer;
use recall_core::routing::{LayerResult, RoutingResult, RoutingStats};
use recall_memory::LayerRegistry;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::classifier::QueryClassifier;

pub struct MemoryRouter {
    classifier: Arc<QueryClassifier>,
    registry: LayerRegistry,
    config: RouterConfig,
    cache: Option<Cache<String, Arc<RoutingResult>>>,
}

impl MemoryRouter {
    pub fn new(classifier: Arc<QueryClassifier>, registry: LayerRegistry, config: RouterConfig) -> Self {
        let cache = config.cache_enabled.then(|| {
            Cache::builder()
                .max_capacity(config.cache_capacity)
                .time_to_live(config.cache_ttl())
                .build()
        });

        debug!(
            layers = ?registry.layers(),
            layer_timeout_ms = config.layer_timeout_ms,
            cache_enabled = config.cache_enabled,
            cache_ttl_secs = config.cache_ttl_secs,
            "Memory router created"
        );

        Self {
            classifier,
            registry,
            config,
            cache,
        }
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route `query` to the layers its classification selects.
    ///
    /// The cache key is the exact query string. A hit returns the stored
    /// result with `stats.cache_hit = true` and no classification or layer
    /// calls.
    pub async fn route(&self, query: &str) -> Result<RoutingResult, ClassificationError> {
        let started = Instant::now();

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(query)) {
            let mut result = RoutingResult::clone(&hit);
            result.stats = RoutingStats {
                total_time_ms: elapsed_ms(started),
                classification_ms: 0,
                cache_hit: true,
                ..result.stats
            };
            debug!(query, "Routing cache hit");
            return Ok(result);
        }

        let classification = self.classifier.classify(query).await?;
        let classification_ms = elapsed_ms(started);

        let results = self.fan_out(query, &classification).await;
        let layers_failed = results.iter().filter(|r| !r.is_ok()).count();

        let result = RoutingResult {
            query: query.to_string(),
            stats: RoutingStats {
                total_time_ms: elapsed_ms(started),
                classification_ms,
                layers_queried: results.len(),
                layers_failed,
                cache_hit: false,
            },
            classification,
            results,
        };

        info!(
            query_type = ?result.classification.query_type,
            layers_queried = result.stats.layers_queried,
            layers_failed,
            items = result.total_items(),
            total_time_ms = result.stats.total_time_ms,
            "Query routed"
        );

        if let Some(cache) = &self.cache {
            cache.insert(query.to_string(), Arc::new(result.clone()));
        }
        Ok(result)
    }

    /// Query every classified layer concurrently. Output order matches
    /// `classification.layers`.
    async fn fan_out(&self, query: &str, classification: &ClassificationResult) -> Vec<LayerResult> {
        let branches = classification.layers.iter().map(|&layer| {
            let weight = classification.weight(layer);
            let timeout = self.config.timeout_for(layer);
            self.query_layer(layer, query, timeout, weight)
        });
        join_all(branches).await
    }

    async fn query_layer(&self, layer: MemoryLayer, query: &str, timeout: Duration, weight: f32) -> LayerResult {
        let Some(source) = self.registry.get(layer) else {
            warn!(layer = %layer, "No source registered for layer");
            return LayerResult::failure(LayerError::NotRegistered { layer }, 0, weight);
        };

        let started = Instant::now();
        let call = AssertUnwindSafe(source.query(query)).catch_unwind();
        let outcome = tokio::time::timeout(timeout, call).await;
        let elapsed = elapsed_ms(started);

        match outcome {
            Ok(Ok(Ok(items))) => {
                debug!(layer = %layer, items = items.len(), elapsed_ms = elapsed, "Layer answered");
                LayerResult::success(layer, items, elapsed, weight)
            }
            Ok(Ok(Err(e))) => {
                warn!(layer = %layer, error = %e, elapsed_ms = elapsed, "Layer query failed");
                LayerResult::failure(attribute(e, layer), elapsed, weight)
            }
            Ok(Err(_panic)) => {
                warn!(layer = %layer, elapsed_ms = elapsed, "Layer query panicked");
                let error = LayerError::QueryFailed {
                    layer,
                    reason: "layer query panicked".into(),
                };
                LayerResult::failure(error, elapsed, weight)
            }
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(layer = %layer, timeout_ms, "Layer query timed out");
                LayerResult::failure(LayerError::Timeout { layer, timeout_ms }, elapsed, weight)
            }
        }
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks();
        }
    }

    /// Number of live cache entries (0 when caching is disabled).
    pub fn cache_len(&self) -> u64 {
        self.cache.as_ref().map_or(0, |c| {
            c.run_pending_tasks();
            c.entry_count()
        })
    }
}

/// Keep the result's layer equal to the layer that was asked, even if the
/// source reported its error under another layer.
fn attribute(error: LayerError, layer: MemoryLayer) -> LayerError {
    if error.layer() == layer {
        error
    } else {
        LayerError::QueryFailed {
            layer,
            reason: error.to_string(),
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
