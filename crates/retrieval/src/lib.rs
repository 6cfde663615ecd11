//! # recall retrieval
//!
//! The context-retrieval pipeline:
//!
//! ```text
//! query ─▶ QueryClassifier ─▶ MemoryRouter ─┬─▶ layer ─┐
//!                                           ├─▶ layer ─┼─▶ FusionEngine ─▶ context
//!                                           └─▶ layer ─┘
//! ```
//!
//! - [`classifier`]: intent detection plus the layer policy table
//! - [`router`]: concurrent fan-out with per-layer timeouts and a TTL cache
//! - [`scoring`] / [`dedup`] / [`fusion`]: rank, collapse near-duplicates,
//!   diversify across layers, fit the token budget
//! - [`combiner`]: stitch multi-hop results together
//! - [`context_router`]: the entry point callers use
//!
//! Only the classifier call and the layer queries suspend. Everything after
//! routing is synchronous computation over data already in hand.

pub mod classifier;
pub mod combiner;
pub mod context_router;
pub mod dedup;
pub mod fusion;
pub mod router;
pub mod scoring;
pub mod token;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::{ClassifierBackend, IntentVerdict, LlmBackend, QueryClassifier, RuleBackend};
pub use combiner::{CombinedEntry, ResultCombiner};
pub use context_router::{ContextRequest, ContextResponse, ContextRouter, ContextStats, LayerOutcome, RoutingSummary};
pub use dedup::SemanticDeduplicator;
pub use fusion::{FusionEngine, FusionOptions, ResultMerger};
pub use router::MemoryRouter;
pub use scoring::{RelevanceScorer, similarity};
pub use token::estimate_tokens;
