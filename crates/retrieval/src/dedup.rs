//! Semantic deduplication: collapse near-duplicates, keep the best-scored.

use recall_core::error::FusionError;
use recall_core::item::ScoredItem;

use crate::scoring::TextFingerprint;

/// Default similarity at or above which two items count as duplicates.
pub const DEFAULT_THRESHOLD: f32 = 0.85;

#[derive(Debug, Clone, Copy)]
pub struct SemanticDeduplicator {
    threshold: f32,
}

impl Default for SemanticDeduplicator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SemanticDeduplicator {
    pub fn new(threshold: f32) -> Result<Self, FusionError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(FusionError::InvalidOption(format!(
                "deduplication threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Keep each item only if it is below the threshold against every item
    /// already kept, walking from the highest score down.
    ///
    /// The result is sorted by score, descending; ties keep input order.
    pub fn deduplicate(&self, items: Vec<ScoredItem>) -> Result<Vec<ScoredItem>, FusionError> {
        let ranked = rank(items)?;
        let mut kept: Vec<(ScoredItem, TextFingerprint)> = Vec::with_capacity(ranked.len());

        for item in ranked {
            let print = TextFingerprint::new(item.text());
            if kept.iter().all(|(_, k)| k.similarity(&print) < self.threshold) {
                kept.push((item, print));
            }
        }

        Ok(kept.into_iter().map(|(item, _)| item).collect())
    }

    /// Group indices of `items` by the surviving item they collapse into.
    ///
    /// Every index appears in exactly one group. A group's first index is its
    /// leader, the member [`deduplicate`](Self::deduplicate) would keep, and
    /// groups are ordered the way `deduplicate` orders its output.
    pub fn find_duplicate_groups(&self, items: &[ScoredItem]) -> Result<Vec<Vec<usize>>, FusionError> {
        check_scores(items.iter())?;

        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| items[b].score.total_cmp(&items[a].score));

        let mut leaders: Vec<TextFingerprint> = Vec::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for idx in order {
            let print = TextFingerprint::new(items[idx].text());
            match leaders.iter().position(|l| l.similarity(&print) >= self.threshold) {
                Some(g) => groups[g].push(idx),
                None => {
                    leaders.push(print);
                    groups.push(vec![idx]);
                }
            }
        }

        Ok(groups)
    }
}

fn check_scores<'a>(items: impl Iterator<Item = &'a ScoredItem>) -> Result<(), FusionError> {
    for item in items {
        if !item.score.is_finite() {
            return Err(FusionError::NonFiniteScore {
                what: "score",
                layer: item.layer(),
                value: item.score,
            });
        }
    }
    Ok(())
}

/// Stable sort by score, descending. Rejects non-finite scores.
fn rank(mut items: Vec<ScoredItem>) -> Result<Vec<ScoredItem>, FusionError> {
    check_scores(items.iter())?;
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::item::MemoryItem;
    use recall_core::layer::MemoryLayer;

    fn scored(text: &str, score: f32) -> ScoredItem {
        ScoredItem::new(MemoryItem::new(MemoryLayer::Project, text), score)
    }

    #[test]
    fn paraphrase_collapses_to_higher_score() {
        let items = vec![
            scored("Use JWT tokens for auth", 0.7),
            scored("Use JWT for auth tokens", 0.9),
        ];
        let out = SemanticDeduplicator::default().deduplicate(items).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.9);
        assert_eq!(out[0].text(), "Use JWT for auth tokens");
    }

    #[test]
    fn distinct_items_survive_sorted() {
        let items = vec![
            scored("postgres connection pool size", 0.4),
            scored("frontend uses tailwind", 0.8),
            scored("CI runs clippy on every push", 0.6),
        ];
        let out = SemanticDeduplicator::default().deduplicate(items).unwrap();
        let scores: Vec<f32> = out.iter().map(|i| i.score).collect();
        assert_eq!(scores, vec![0.8, 0.6, 0.4]);
    }

    #[test]
    fn no_survivors_are_near_duplicates() {
        let items = vec![
            scored("cache ttl is five minutes", 0.9),
            scored("cache ttl is five minutes", 0.8),
            scored("the cache ttl is five minutes long", 0.7),
            scored("layers time out after fifty ms", 0.6),
        ];
        let dedup = SemanticDeduplicator::default();
        let out = dedup.deduplicate(items).unwrap();
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                assert!(crate::scoring::similarity(&a.text(), &b.text()) < dedup.threshold());
            }
        }
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let items = vec![scored("alpha", 0.5), scored("beta", 0.5), scored("gamma", 0.5)];
        let out = SemanticDeduplicator::default().deduplicate(items).unwrap();
        let texts: Vec<String> = out.iter().map(|i| i.text().into_owned()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn threshold_zero_keeps_only_the_best() {
        let items = vec![scored("alpha", 0.5), scored("beta", 0.9)];
        let out = SemanticDeduplicator::new(0.0).unwrap().deduplicate(items).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.9);
    }

    #[test]
    fn groups_match_deduplicate() {
        let items = vec![
            scored("Use JWT tokens for auth", 0.7),
            scored("layers time out after fifty ms", 0.6),
            scored("Use JWT for auth tokens", 0.9),
        ];
        let dedup = SemanticDeduplicator::default();
        let groups = dedup.find_duplicate_groups(&items).unwrap();
        assert_eq!(groups, vec![vec![2, 0], vec![1]]);

        let survivors = dedup.deduplicate(items.clone()).unwrap();
        let leaders: Vec<&ScoredItem> = groups.iter().map(|g| &items[g[0]]).collect();
        assert_eq!(survivors.len(), leaders.len());
        for (s, l) in survivors.iter().zip(leaders) {
            assert_eq!(s, l);
        }
    }

    #[test]
    fn identical_symbol_only_items_collapse() {
        let items = vec![scored("!!!", 0.4), scored("!!!", 0.6), scored("???", 0.5)];
        let dedup = SemanticDeduplicator::default();
        let out = dedup.deduplicate(items.clone()).unwrap();
        let texts: Vec<String> = out.iter().map(|i| i.text().into_owned()).collect();
        assert_eq!(texts, vec!["!!!", "???"]);
        assert_eq!(out[0].score, 0.6);
        assert_eq!(dedup.find_duplicate_groups(&items).unwrap(), vec![vec![1, 0], vec![2]]);
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let items = vec![scored("alpha", f32::NAN)];
        let dedup = SemanticDeduplicator::default();
        assert!(matches!(
            dedup.deduplicate(items.clone()),
            Err(FusionError::NonFiniteScore { .. })
        ));
        assert!(dedup.find_duplicate_groups(&items).is_err());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        assert!(SemanticDeduplicator::new(1.5).is_err());
        assert!(SemanticDeduplicator::new(f32::NAN).is_err());
    }
}
