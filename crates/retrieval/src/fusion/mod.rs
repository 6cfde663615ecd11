//! Fusion: turning a routing batch into a ranked, deduplicated,
//! token-budgeted context packet.

pub mod engine;
pub mod merger;

pub use engine::FusionEngine;
pub use merger::ResultMerger;

/// Per-call fusion options. Same shape as the `[fusion]` config section.
pub type FusionOptions = recall_config::FusionConfig;
