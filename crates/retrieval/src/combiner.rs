//! Multi-hop result combination.
//!
//! When a query is decomposed into an ordered sequence of sub-queries, each
//! hop's fused context is stitched into one list: hops in sub-query order,
//! items by score within a hop, cross-hop repeats dropped by a structural
//! key, with an optional separator marking where each later hop begins.

use std::collections::HashSet;

use recall_config::CombinerConfig;
use recall_core::item::{FusedItem, HopResult};
use recall_core::layer::MemoryLayer;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Characters of content used in the cross-hop dedup key.
const KEY_PREFIX_CHARS: usize = 100;

/// One entry of a combined multi-hop context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombinedEntry {
    Item(FusedItem),
    /// Marks the start of a hop's items.
    Separator {
        #[serde(rename = "subQueryId")]
        sub_query_id: usize,
        #[serde(rename = "subQuery")]
        sub_query: String,
    },
}

impl CombinedEntry {
    pub fn as_item(&self) -> Option<&FusedItem> {
        match self {
            Self::Item(item) => Some(item),
            Self::Separator { .. } => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultCombiner {
    config: CombinerConfig,
}

impl Default for ResultCombiner {
    fn default() -> Self {
        Self::new(CombinerConfig::default())
    }
}

impl ResultCombiner {
    pub fn new(config: CombinerConfig) -> Self {
        Self { config }
    }

    /// Combine hops. At most `max_results` items are returned; separators
    /// are extra and only appear between hops that both contributed items.
    pub fn combine(&self, hops: &[HopResult]) -> Vec<CombinedEntry> {
        let mut ordered: Vec<&HopResult> = hops.iter().collect();
        ordered.sort_by_key(|h| h.sub_query_id);

        let mut seen: HashSet<(MemoryLayer, String)> = HashSet::new();
        let mut entries = Vec::new();
        let mut emitted = 0usize;
        let mut dropped = 0usize;

        'hops: for hop in ordered {
            let mut ranked: Vec<&FusedItem> = hop.context.iter().collect();
            ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

            let mut hop_started = false;
            for item in ranked {
                if emitted >= self.config.max_results {
                    break 'hops;
                }
                if !seen.insert(dedup_key(item)) {
                    dropped += 1;
                    continue;
                }
                if !hop_started {
                    if self.config.include_separators && emitted > 0 {
                        entries.push(CombinedEntry::Separator {
                            sub_query_id: hop.sub_query_id,
                            sub_query: hop.sub_query.clone(),
                        });
                    }
                    hop_started = true;
                }
                entries.push(CombinedEntry::Item(item.clone()));
                emitted += 1;
            }
        }

        debug!(hops = hops.len(), items = emitted, duplicates = dropped, "Hops combined");
        entries
    }

    /// [`combine`](Self::combine) without separators, items only.
    pub fn combine_items(&self, hops: &[HopResult]) -> Vec<FusedItem> {
        self.combine(hops)
            .into_iter()
            .filter_map(|e| match e {
                CombinedEntry::Item(item) => Some(item),
                CombinedEntry::Separator { .. } => None,
            })
            .collect()
    }
}

fn dedup_key(item: &FusedItem) -> (MemoryLayer, String) {
    (item.layer, item.text().chars().take(KEY_PREFIX_CHARS).collect())
}
