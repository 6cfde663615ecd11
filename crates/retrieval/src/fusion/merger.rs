//! Result merger: flatten → score → filter → dedup → diversify → truncate.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use recall_core::error::FusionError;
use recall_core::item::{FusedItem, FusedResult, FusionStats, MemoryItem, ScoredItem};
use recall_core::layer::MemoryLayer;
use recall_core::routing::RoutingResult;
use tracing::debug;

use super::FusionOptions;
use crate::dedup::SemanticDeduplicator;
use crate::scoring::RelevanceScorer;
use crate::token::estimate_item_tokens;

/// Stateless; all tuning comes in through [`FusionOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger {
    scorer: RelevanceScorer,
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, routing: &RoutingResult, options: &FusionOptions) -> Result<FusedResult, FusionError> {
        self.merge_at(routing, options, Utc::now())
    }

    /// [`merge`](Self::merge) with an explicit clock for recency scoring.
    pub fn merge_at(
        &self,
        routing: &RoutingResult,
        options: &FusionOptions,
        now: DateTime<Utc>,
    ) -> Result<FusedResult, FusionError> {
        validate_weights(options)?;

        let raw = flatten(routing);
        let raw_count = raw.len();

        let scored = self.scorer.score_at(&routing.query, &raw, now)?;
        let eligible: Vec<ScoredItem> = scored
            .into_iter()
            .filter(|s| s.score >= options.min_score)
            .collect();
        let eligible_count = eligible.len();

        let deduped = SemanticDeduplicator::new(options.deduplication_threshold)?.deduplicate(eligible)?;
        let total_items = deduped.len();

        let weights: HashMap<MemoryLayer, f32> = routing
            .results
            .iter()
            .map(|r| (r.layer, r.weight))
            .collect();
        let ordered = diversify(deduped, &weights, options.diversity_weight, options.min_score);

        let mut estimated_tokens = 0usize;
        let mut items: Vec<FusedItem> = Vec::new();
        for item in ordered {
            let cost = estimate_item_tokens(&item);
            if estimated_tokens + cost > options.max_tokens {
                break;
            }
            estimated_tokens += cost;
            items.push(item.into());
        }

        debug!(
            raw = raw_count,
            eligible = eligible_count,
            deduplicated = total_items,
            selected = items.len(),
            estimated_tokens,
            max_tokens = options.max_tokens,
            "Fusion complete"
        );

        Ok(FusedResult {
            stats: FusionStats {
                total_items,
                final_items: items.len(),
                estimated_tokens,
            },
            items,
        })
    }
}

/// Full check for configured defaults, including a non-zero budget.
pub(super) fn validate(options: &FusionOptions) -> Result<(), FusionError> {
    options
        .validate()
        .map_err(|e| FusionError::InvalidOption(e.to_string()))
}

fn validate_weights(options: &FusionOptions) -> Result<(), FusionError> {
    options
        .validate_weights()
        .map_err(|e| FusionError::InvalidOption(e.to_string()))
}

/// All items from successful layers, tagged with their layer and its weight.
fn flatten(routing: &RoutingResult) -> Vec<MemoryItem> {
    routing
        .results
        .iter()
        .filter_map(|r| r.items.as_ref().map(|items| (r, items)))
        .flat_map(|(r, items)| {
            items.iter().map(move |item| MemoryItem {
                layer: r.layer,
                layer_weight: Some(r.weight),
                ..item.clone()
            })
        })
        .collect()
}

/// Order items so that no single layer monopolises the top of the list.
///
/// `items` must already be sorted by score, descending. With `diversity_weight == 0` this is a plain stable sort by score.
/// Otherwise:
///
/// 1. Every layer whose best item scores within `min_score` of the overall
///    leader gets that best item placed first, in score order.
/// 2. The rest are picked greedily by
///    `score - diversity_weight * max(0, projected_share - target_share)`,
///    where `projected_share` is the layer's share of picks if this item were
///    taken next and `target_share` is its weight's share of the total weight
///    of layers present. Ties go to the earlier item.
fn diversify(
    items: Vec<ScoredItem>,
    weights: &HashMap<MemoryLayer, f32>,
    diversity_weight: f32,
    min_score: f32,
) -> Vec<ScoredItem> {
    let Some(leader) = items.first().map(|i| i.score) else {
        return items;
    };

    // BTreeMap for a deterministic iteration order.
    let mut best: BTreeMap<MemoryLayer, usize> = BTreeMap::new();
    for (idx, item) in items.iter().enumerate() {
        best.entry(item.layer()).or_insert(idx);
    }
    if diversity_weight <= 0.0 || best.len() < 2 {
        return items;
    }

    let total_weight: f32 = best.keys().map(|l| weights.get(l).copied().unwrap_or(1.0)).sum();
    let target = |layer: MemoryLayer| -> f32 {
        if total_weight > 0.0 {
            weights.get(&layer).copied().unwrap_or(1.0) / total_weight
        } else {
            1.0 / best.len() as f32
        }
    };

    let mut seeds: Vec<usize> = best
        .values()
        .copied()
        .filter(|&idx| items[idx].score >= leader - min_score)
        .collect();
    seeds.sort_unstable();

    let mut taken = vec![false; items.len()];
    let mut picks: HashMap<MemoryLayer, usize> = HashMap::new();
    let mut order: Vec<usize> = Vec::with_capacity(items.len());

    for idx in seeds {
        taken[idx] = true;
        *picks.entry(items[idx].layer()).or_insert(0) += 1;
        order.push(idx);
    }

    while order.len() < items.len() {
        let total = order.len() as f32;
        let mut chosen: Option<(usize, f32)> = None;
        for (idx, item) in items.iter().enumerate() {
            if taken[idx] {
                continue;
            }
            let layer = item.layer();
            let projected = (picks.get(&layer).copied().unwrap_or(0) as f32 + 1.0) / (total + 1.0);
            let penalty = (projected - target(layer)).max(0.0);
            let adjusted = item.score - diversity_weight * penalty;
            if chosen.is_none_or(|(_, top)| adjusted > top) {
                chosen = Some((idx, adjusted));
            }
        }
        let Some((idx, _)) = chosen else { break };
        taken[idx] = true;
        *picks.entry(items[idx].layer()).or_insert(0) += 1;
        order.push(idx);
    }

    let mut slots: Vec<Option<ScoredItem>> = items.into_iter().map(Some).collect();
    order.into_iter().filter_map(|idx| slots[idx].take()).collect()
}
