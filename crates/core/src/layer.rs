//! Memory layers: the independent context sources the router fans out to.
//!
//! Layers are peers: none owns another, and the pipeline only ever sees them
//! through [`LayerSource::query`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::item::MemoryItem;

/// One of the fixed set of context sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    /// Current working session (recent turns, open task)
    Session,
    /// Project-scoped records (decisions, conventions, progress)
    Project,
    /// User-scoped records (preferences, expertise)
    User,
    /// Flat embedding index over code and docs
    Vector,
    /// Code dependency graph
    Graph,
    /// Append-only governance / audit log
    Governance,
}

impl MemoryLayer {
    /// Every layer, in canonical order.
    pub const ALL: [MemoryLayer; 6] = [
        MemoryLayer::Session,
        MemoryLayer::Project,
        MemoryLayer::User,
        MemoryLayer::Vector,
        MemoryLayer::Graph,
        MemoryLayer::Governance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Project => "project",
            Self::User => "user",
            Self::Vector => "vector",
            Self::Graph => "graph",
            Self::Governance => "governance",
        }
    }
}

impl std::fmt::Display for MemoryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemoryLayer::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown memory layer '{s}'"))
    }
}

/// The only capability a memory layer exposes to the pipeline.
///
/// Implementations may be abandoned mid-flight: when a query exceeds its
/// budget the router drops the future, so a source must not rely on being
/// polled to completion for any side effect.
#[async_trait]
pub trait LayerSource: Send + Sync {
    /// Which layer this source answers for.
    fn layer(&self) -> MemoryLayer;

    /// Return the items this layer considers related to `text`.
    async fn query(&self, text: &str) -> std::result::Result<Vec<MemoryItem>, LayerError>;
}
