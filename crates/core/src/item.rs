//! Item value types: what layers return, what scoring produces, and what the
//! fused context packet is made of.
//!
//! All of these are plain values. Once built they are only ever consumed,
//! never mutated, by downstream stages.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layer::MemoryLayer;

/// Opaque item content: either text or a JSON structure from the layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemContent {
    Text(String),
    Structured(serde_json::Value),
}

impl ItemContent {
    /// Textual view used for scoring, similarity and token estimation.
    ///
    /// Structured content is rendered as compact JSON.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Structured(serde_json::Value::String(s)) => Cow::Borrowed(s),
            Self::Structured(v) => Cow::Owned(v.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Structured(v) => v.is_null(),
        }
    }
}

impl From<&str> for ItemContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ItemContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<serde_json::Value> for ItemContent {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}

/// A raw item as returned by a memory layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    /// The content of the item
    pub content: ItemContent,

    /// The layer it came from
    pub layer: MemoryLayer,

    /// When the underlying record was written (drives recency scoring)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Weight of the originating layer, stamped by the merger from the
    /// classification. Absent means 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_weight: Option<f32>,
}

impl MemoryItem {
    /// Create an item with no timestamp and no layer weight.
    pub fn new(layer: MemoryLayer, content: impl Into<ItemContent>) -> Self {
        Self {
            content: content.into(),
            layer,
            timestamp: None,
            layer_weight: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_layer_weight(mut self, weight: f32) -> Self {
        self.layer_weight = Some(weight);
        self
    }

    pub fn text(&self) -> Cow<'_, str> {
        self.content.as_text()
    }
}

/// A memory item with its relevance score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: MemoryItem,
    pub score: f32,
}

impl ScoredItem {
    pub fn new(item: MemoryItem, score: f32) -> Self {
        Self { item, score }
    }

    pub fn layer(&self) -> MemoryLayer {
        self.item.layer
    }

    pub fn text(&self) -> Cow<'_, str> {
        self.item.text()
    }
}

/// The externally visible unit of context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedItem {
    pub content: ItemContent,
    pub layer: MemoryLayer,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl FusedItem {
    pub fn text(&self) -> Cow<'_, str> {
        self.content.as_text()
    }
}

impl From<ScoredItem> for FusedItem {
    fn from(scored: ScoredItem) -> Self {
        let mut metadata = serde_json::Map::new();
        if let Some(ts) = scored.item.timestamp {
            metadata.insert("timestamp".into(), serde_json::json!(ts.to_rfc3339()));
        }
        if let Some(w) = scored.item.layer_weight {
            metadata.insert("layerWeight".into(), serde_json::json!(w));
        }
        Self {
            content: scored.item.content,
            layer: scored.item.layer,
            score: scored.score,
            metadata: (!metadata.is_empty()).then_some(metadata),
        }
    }
}

/// Counters describing what fusion kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionStats {
    /// Items surviving the score floor and deduplication
    pub total_items: usize,
    /// Items surviving the token budget
    pub final_items: usize,
    /// Estimated tokens of the final items
    pub estimated_tokens: usize,
}

/// A ranked, deduplicated, token-budgeted context packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub items: Vec<FusedItem>,
    pub stats: FusionStats,
}

/// One hop of a multi-hop retrieval: a sub-query and its fused context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopResult {
    /// Sequence number of the sub-query within the decomposed query
    pub sub_query_id: usize,
    pub sub_query: String,
    pub context: Vec<FusedItem>,
}
