//! Fusion engine: owns the default fusion options and delegates to
//! [`ResultMerger`].

use std::sync::RwLock;

use recall_core::error::FusionError;
use recall_core::item::FusedResult;
use recall_core::routing::RoutingResult;
use tracing::info;

use super::FusionOptions;
use super::merger::ResultMerger;

/// Defaults can be swapped at runtime from any thread; each call to
/// [`fuse`](Self::fuse) uses a snapshot taken when it starts.
#[derive(Debug, Default)]
pub struct FusionEngine {
    merger: ResultMerger,
    defaults: RwLock<FusionOptions>,
}

impl FusionEngine {
    pub fn new(defaults: FusionOptions) -> Result<Self, FusionError> {
        let engine = Self::default();
        engine.set_defaults(defaults)?;
        Ok(engine)
    }

    /// Current defaults.
    pub fn defaults(&self) -> FusionOptions {
        *self.defaults.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the defaults. Invalid options leave the old ones in place.
    pub fn set_defaults(&self, options: FusionOptions) -> Result<(), FusionError> {
        super::merger::validate(&options)?;
        *self.defaults.write().unwrap_or_else(|e| e.into_inner()) = options;
        info!(
            max_tokens = options.max_tokens,
            min_score = options.min_score,
            diversity_weight = options.diversity_weight,
            deduplication_threshold = options.deduplication_threshold,
            "Fusion defaults updated"
        );
        Ok(())
    }

    /// Fuse with the current defaults.
    pub fn fuse(&self, routing: &RoutingResult) -> Result<FusedResult, FusionError> {
        self.merger.merge(routing, &self.defaults())
    }

    /// Fuse with explicit options, ignoring the defaults.
    pub fn fuse_with(&self, routing: &RoutingResult, options: &FusionOptions) -> Result<FusedResult, FusionError> {
        self.merger.merge(routing, options)
    }
}
