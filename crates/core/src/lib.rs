//! # recall core
//!
//! Domain types, traits, and error definitions for the recall context-retrieval
//! pipeline. This crate has **zero framework dependencies**: it defines the
//! value types that flow through classification, routing and fusion, plus the
//! two seams the pipeline talks through.
//!
//! ## Seams
//!
//! - [`LayerSource`]: the single capability a memory layer exposes
//!   (`query(text) -> items`). How a layer stores or computes its answer is
//!   invisible to the pipeline.
//! - [`Provider`]: the LLM backend used for query classification.
//!
//! Every other crate depends inward on this one, which keeps the stores,
//! the model backends and the pipeline swappable and testable in isolation.

pub mod classification;
pub mod error;
pub mod item;
pub mod layer;
pub mod message;
pub mod provider;
pub mod routing;

// Re-export key types at crate root for ergonomics
pub use classification::{ClassificationResult, IntentRoute, LayerPolicy, LayerWeight, QueryType};
pub use error::{ClassificationError, Error, FusionError, LayerError, ProviderError, Result};
pub use item::{FusedItem, FusedResult, FusionStats, HopResult, ItemContent, MemoryItem, ScoredItem};
pub use layer::{LayerSource, MemoryLayer};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use routing::{LayerResult, RoutingResult, RoutingStats};
