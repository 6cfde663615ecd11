//! Context router: the pipeline entry point.
//!
//! Classify → route → fuse, strictly in that order, with wall-clock timing
//! per stage. Pure composition: caching lives in the router, scoring in
//! fusion, and nothing here retries.

use std::sync::Arc;

use recall_config::AppConfig;
use recall_core::classification::ClassificationResult;
use recall_core::error::{Error, LayerError};
use recall_core::item::{FusedItem, HopResult};
use recall_core::layer::MemoryLayer;
use recall_core::routing::LayerResult;
use recall_memory::LayerRegistry;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::classifier::QueryClassifier;
use crate::combiner::{CombinedEntry, ResultCombiner};
use crate::fusion::FusionEngine;
use crate::router::MemoryRouter;

/// Logs at info in debug mode, at debug otherwise.
macro_rules! stage {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequest {
    pub query: String,
    /// Overrides the fusion default for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl ContextRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// How one layer fared for this request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOutcome {
    pub layer: MemoryLayer,
    pub ok: bool,
    pub items: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LayerError>,
}

impl From<&LayerResult> for LayerOutcome {
    fn from(r: &LayerResult) -> Self {
        Self {
            layer: r.layer,
            ok: r.is_ok(),
            items: r.item_count(),
            elapsed_ms: r.elapsed_ms,
            error: r.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingSummary {
    pub layers: Vec<MemoryLayer>,
    pub reasoning: String,
    pub outcomes: Vec<LayerOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStats {
    pub classification_ms: u64,
    pub routing_ms: u64,
    pub fusion_ms: u64,
    pub total_ms: u64,
    pub layers_queried: usize,
    pub layers_failed: usize,
    pub cache_hit: bool,
    pub total_items: usize,
    pub final_items: usize,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub query: String,
    pub classification: ClassificationResult,
    pub routing: RoutingSummary,
    pub context: Vec<FusedItem>,
    pub stats: ContextStats,
}

pub struct ContextRouter {
    router: MemoryRouter,
    fusion: FusionEngine,
    combiner: ResultCombiner,
    debug: bool,
}

impl ContextRouter {
    pub fn new(router: MemoryRouter, fusion: FusionEngine) -> Self {
        Self {
            router,
            fusion,
            combiner: ResultCombiner::default(),
            debug: false,
        }
    }

    pub fn with_combiner(mut self, combiner: ResultCombiner) -> Self {
        self.combiner = combiner;
        self
    }

    /// Promote stage timing logs from debug to info.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Wire the whole pipeline from configuration. Call [`init`](Self::init)
    /// before routing.
    pub fn from_config(config: &AppConfig, registry: LayerRegistry) -> Result<Self, Error> {
        let classifier = Arc::new(QueryClassifier::from_config(&config.classifier)?);
        let router = MemoryRouter::new(classifier, registry, config.router.clone());
        let fusion = FusionEngine::new(config.fusion)?;
        Ok(Self::new(router, fusion)
            .with_combiner(ResultCombiner::new(config.combiner))
            .with_debug(config.debug))
    }

    /// Initialize the classifier backend. Failure is fatal to the pipeline.
    pub async fn init(&self) -> Result<(), Error> {
        self.router.classifier().init().await?;
        Ok(())
    }

    pub fn router(&self) -> &MemoryRouter {
        &self.router
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }

    /// Run one query through the pipeline.
    ///
    /// Fails only when classification fails (or on a fusion programming
    /// error); layer failures show up in `routing.outcomes` and `stats`.
    pub async fn route(&self, request: ContextRequest) -> Result<ContextResponse, Error> {
        let started = Instant::now();

        let routing = self.router.route(&request.query).await?;
        let classification_ms = routing.stats.classification_ms;
        let routing_ms = routing.stats.total_time_ms.saturating_sub(classification_ms);
        stage!(
            self.debug,
            query_type = ?routing.classification.query_type,
            confidence = routing.classification.confidence,
            classification_ms,
            "Stage: classification"
        );
        stage!(
            self.debug,
            layers_queried = routing.stats.layers_queried,
            layers_failed = routing.stats.layers_failed,
            cache_hit = routing.stats.cache_hit,
            routing_ms,
            "Stage: routing"
        );

        let fusion_started = Instant::now();
        let mut options = self.fusion.defaults();
        if let Some(max_tokens) = request.max_tokens {
            options.max_tokens = max_tokens;
        }
        let fused = self.fusion.fuse_with(&routing, &options)?;
        let fusion_ms = elapsed_ms(fusion_started);
        stage!(
            self.debug,
            total_items = fused.stats.total_items,
            final_items = fused.stats.final_items,
            estimated_tokens = fused.stats.estimated_tokens,
            fusion_ms,
            "Stage: fusion"
        );

        let stats = ContextStats {
            classification_ms,
            routing_ms,
            fusion_ms,
            total_ms: elapsed_ms(started),
            layers_queried: routing.stats.layers_queried,
            layers_failed: routing.stats.layers_failed,
            cache_hit: routing.stats.cache_hit,
            total_items: fused.stats.total_items,
            final_items: fused.stats.final_items,
            estimated_tokens: fused.stats.estimated_tokens,
        };

        info!(
            final_items = stats.final_items,
            estimated_tokens = stats.estimated_tokens,
            total_ms = stats.total_ms,
            "Context assembled"
        );

        Ok(ContextResponse {
            routing: RoutingSummary {
                layers: routing.classification.layers.clone(),
                reasoning: routing.classification.reasoning.clone(),
                outcomes: routing.results.iter().map(LayerOutcome::from).collect(),
            },
            query: routing.query,
            classification: routing.classification,
            context: fused.items,
            stats,
        })
    }

    /// Run an ordered list of sub-queries one after another and combine
    /// their contexts.
    pub async fn route_hops(&self, sub_queries: &[String], max_tokens: Option<usize>) -> Result<Vec<CombinedEntry>, Error> {
        let mut hops = Vec::with_capacity(sub_queries.len());
        for (sub_query_id, sub_query) in sub_queries.iter().enumerate() {
            let mut request = ContextRequest::new(sub_query.clone());
            request.max_tokens = max_tokens;
            let response = self.route(request).await?;
            hops.push(HopResult {
                sub_query_id,
                sub_query: sub_query.clone(),
                context: response.context,
            });
        }
        Ok(self.combiner.combine(&hops))
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
