//! Relevance scoring and the pairwise similarity primitive.
//!
//! One similarity definition is used everywhere: cosine similarity over
//! term-frequency vectors of lower-cased alphanumeric tokens. It serves both
//! query-to-item relevance (the semantic signal below) and item-to-item
//! duplicate detection in [`crate::dedup`], so a deduplication threshold of
//! 0.85 means "85% cosine overlap of word counts", nothing else.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use recall_core::error::FusionError;
use recall_core::item::{MemoryItem, ScoredItem};

pub const SEMANTIC_WEIGHT: f32 = 0.4;
pub const KEYWORD_WEIGHT: f32 = 0.3;
pub const LAYER_WEIGHT: f32 = 0.2;
pub const RECENCY_WEIGHT: f32 = 0.1;

/// Items older than this get no recency credit.
pub const RECENCY_WINDOW_DAYS: i64 = 30;

/// Recency signal for items without a timestamp.
pub const NEUTRAL_RECENCY: f32 = 0.5;

/// Lower-cased alphanumeric tokens, in order, duplicates kept.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A term-frequency vector with its norm precomputed.
#[derive(Debug, Clone, Default)]
pub struct TermVector {
    counts: HashMap<String, u32>,
    norm: f64,
}

impl TermVector {
    pub fn new(text: &str) -> Self {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0) += 1;
        }
        let norm = counts
            .values()
            .map(|&c| f64::from(c) * f64::from(c))
            .sum::<f64>()
            .sqrt();
        Self { counts, norm }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.counts.contains_key(term)
    }

    /// Cosine similarity in [0, 1]. Zero when either side has no terms.
    pub fn cosine(&self, other: &TermVector) -> f32 {
        let denom = self.norm * other.norm;
        if denom < 1e-10 {
            return 0.0;
        }

        // Iterate the smaller map
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (&self.counts, &other.counts)
        } else {
            (&other.counts, &self.counts)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(term, &a)| large.get(term).map(|&b| f64::from(a) * f64::from(b)))
            .sum();

        ((dot / denom) as f32).clamp(0.0, 1.0)
    }
}

/// A text together with its term vector, for repeated pairwise comparison.
#[derive(Debug, Clone)]
pub struct TextFingerprint {
    text: String,
    vector: TermVector,
}

impl TextFingerprint {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let vector = TermVector::new(&text);
        Self { text, vector }
    }

    /// Term cosine, except that identical texts are always 1.0. Text with no
    /// alphanumeric tokens ("!!!", emoji) has an empty vector and would
    /// otherwise never match even its own copy.
    pub fn similarity(&self, other: &TextFingerprint) -> f32 {
        if self.text == other.text {
            return 1.0;
        }
        self.vector.cosine(&other.vector)
    }
}

/// Pairwise similarity between two texts. See [`TextFingerprint::similarity`].
pub fn similarity(a: &str, b: &str) -> f32 {
    TextFingerprint::new(a).similarity(&TextFingerprint::new(b))
}

/// Query tokens longer than two characters, deduplicated.
fn query_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|t| t.chars().count() > 2 && seen.insert(t.clone()))
        .collect()
}

/// Fraction of `keywords` present among the item's terms.
fn keyword_overlap(keywords: &[String], item: &TermVector) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords.iter().filter(|k| item.contains(k)).count();
    hits as f32 / keywords.len() as f32
}

/// 1.0 for now (or the future), linearly down to 0.0 at the window edge.
pub fn recency(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
    let Some(ts) = timestamp else {
        return NEUTRAL_RECENCY;
    };
    let age_secs = (now - ts).num_seconds();
    if age_secs <= 0 {
        return 1.0;
    }
    let window_secs = RECENCY_WINDOW_DAYS * 24 * 60 * 60;
    (1.0 - age_secs as f64 / window_secs as f64).max(0.0) as f32
}

/// The four normalized signals behind one score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub semantic: f32,
    pub keyword: f32,
    pub layer: f32,
    pub recency: f32,
}

impl Signals {
    pub fn combined(&self) -> f32 {
        SEMANTIC_WEIGHT * self.semantic
            + KEYWORD_WEIGHT * self.keyword
            + LAYER_WEIGHT * self.layer
            + RECENCY_WEIGHT * self.recency
    }
}

/// Scores items against a query. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer;

impl RelevanceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score every item against `query`, preserving input order.
    pub fn score(&self, query: &str, items: &[MemoryItem]) -> Result<Vec<ScoredItem>, FusionError> {
        self.score_at(query, items, Utc::now())
    }

    /// [`score`](Self::score) with an explicit clock, for reproducible recency.
    pub fn score_at(
        &self,
        query: &str,
        items: &[MemoryItem],
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredItem>, FusionError> {
        let query_vec = TermVector::new(query);
        let keywords = query_keywords(query);

        items
            .iter()
            .map(|item| {
                let signals = self.signals_with(&query_vec, &keywords, item, now)?;
                let score = signals.combined();
                if !score.is_finite() {
                    return Err(FusionError::NonFiniteScore {
                        what: "score",
                        layer: item.layer,
                        value: score,
                    });
                }
                Ok(ScoredItem::new(item.clone(), score.clamp(0.0, 1.0)))
            })
            .collect()
    }

    /// Break one item's score into its signals.
    pub fn signals(&self, query: &str, item: &MemoryItem, now: DateTime<Utc>) -> Result<Signals, FusionError> {
        self.signals_with(&TermVector::new(query), &query_keywords(query), item, now)
    }

    fn signals_with(
        &self,
        query_vec: &TermVector,
        keywords: &[String],
        item: &MemoryItem,
        now: DateTime<Utc>,
    ) -> Result<Signals, FusionError> {
        let layer_weight = item.layer_weight.unwrap_or(1.0);
        if !layer_weight.is_finite() {
            return Err(FusionError::NonFiniteScore {
                what: "layer weight",
                layer: item.layer,
                value: layer_weight,
            });
        }

        let item_vec = TermVector::new(&item.text());
        Ok(Signals {
            semantic: query_vec.cosine(&item_vec),
            keyword: keyword_overlap(keywords, &item_vec),
            layer: layer_weight.clamp(0.0, 1.0),
            recency: recency(item.timestamp, now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use recall_core::layer::MemoryLayer;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn identical_symbol_only_texts_are_fully_similar() {
        assert_eq!(similarity("!!!", "!!!"), 1.0);
        assert_eq!(similarity("🚀🚀", "🚀🚀"), 1.0);
        assert!(TermVector::new("!!!").is_empty());
    }

    #[test]
    fn tokenize_lowercases_and_splits_on_punctuation() {
        assert_eq!(tokenize("Use JWT-based auth!"), vec!["use", "jwt", "based", "auth"]);
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn similarity_ignores_word_order() {
        assert!(approx(similarity("Use JWT for auth tokens", "Use JWT tokens for auth"), 1.0));
    }

    #[test]
    fn similarity_of_disjoint_texts_is_zero() {
        assert_eq!(similarity("database migrations", "frontend styling"), 0.0);
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("!!!", "???"), 0.0);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let a = "retry the failing layer query";
        let b = "the layer query timed out, retry later";
        let ab = similarity(a, b);
        assert!(approx(ab, similarity(b, a)));
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn recency_decays_linearly() {
        let now = Utc::now();
        assert_eq!(recency(None, now), NEUTRAL_RECENCY);
        assert_eq!(recency(Some(now), now), 1.0);
        assert_eq!(recency(Some(now + Duration::hours(1)), now), 1.0);
        assert!(approx(recency(Some(now - Duration::days(15)), now), 0.5));
        assert_eq!(recency(Some(now - Duration::days(45)), now), 0.0);
    }

    #[test]
    fn perfect_match_scores_one() {
        let now = Utc::now();
        let item = MemoryItem::new(MemoryLayer::Session, "jwt auth").with_timestamp(now);
        let scored = RelevanceScorer::new().score_at("jwt auth", &[item], now).unwrap();
        assert!(approx(scored[0].score, 1.0));
    }

    #[test]
    fn missing_timestamp_and_weight_use_neutral_values() {
        let now = Utc::now();
        let item = MemoryItem::new(MemoryLayer::Vector, "jwt auth");
        let scored = RelevanceScorer::new().score_at("jwt auth", &[item], now).unwrap();
        // 0.4 + 0.3 + 0.2 * 1.0 + 0.1 * 0.5
        assert!(approx(scored[0].score, 0.95));
    }

    #[test]
    fn layer_weight_moves_the_score() {
        let now = Utc::now();
        let heavy = MemoryItem::new(MemoryLayer::Graph, "auth module").with_layer_weight(1.0);
        let light = MemoryItem::new(MemoryLayer::Graph, "auth module").with_layer_weight(0.5);
        let scored = RelevanceScorer::new()
            .score_at("auth", &[heavy, light], now)
            .unwrap();
        assert!(approx(scored[0].score - scored[1].score, 0.1));
    }

    #[test]
    fn unrelated_item_keeps_only_layer_and_recency_credit() {
        let now = Utc::now();
        let item = MemoryItem::new(MemoryLayer::User, "prefers tabs").with_layer_weight(0.0);
        let signals = RelevanceScorer::new().signals("database schema", &item, now).unwrap();
        assert_eq!(signals.semantic, 0.0);
        assert_eq!(signals.keyword, 0.0);
        assert!(approx(signals.combined(), 0.05));
    }

    #[test]
    fn short_query_words_are_not_keywords() {
        let now = Utc::now();
        let item = MemoryItem::new(MemoryLayer::Project, "an ok thing");
        let signals = RelevanceScorer::new().signals("an ok", &item, now).unwrap();
        assert_eq!(signals.keyword, 0.0);
        assert!(signals.semantic > 0.0);
    }

    #[test]
    fn scores_are_clamped_and_order_preserved() {
        let now = Utc::now();
        let items = vec![
            MemoryItem::new(MemoryLayer::Session, "first").with_layer_weight(7.0),
            MemoryItem::new(MemoryLayer::Session, "second"),
        ];
        let scored = RelevanceScorer::new().score_at("first", &items, now).unwrap();
        assert_eq!(scored[0].text(), "first");
        assert_eq!(scored[1].text(), "second");
        assert!(scored.iter().all(|s| (0.0..=1.0).contains(&s.score)));
    }

    #[test]
    fn nan_layer_weight_is_an_error() {
        let item = MemoryItem::new(MemoryLayer::Vector, "x").with_layer_weight(f32::NAN);
        let err = RelevanceScorer::new().score("x", &[item]).unwrap_err();
        assert!(matches!(
            err,
            FusionError::NonFiniteScore { what: "layer weight", layer: MemoryLayer::Vector, .. }
        ));
    }
}
