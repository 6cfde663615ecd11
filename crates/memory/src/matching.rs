//! Keyword matching shared by the reference adapters.

use std::collections::HashSet;

use recall_core::item::MemoryItem;

/// Lower-cased alphanumeric words longer than two characters, deduplicated
/// in first-seen order.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Items sharing at least one keyword with `query`, best match first.
///
/// Ranking is by number of matched keywords, then newest timestamp.
/// This is a candidate filter, not relevance scoring; the pipeline rescores
/// everything it receives.
pub fn select<'a>(
    items: impl IntoIterator<Item = &'a MemoryItem>,
    query: &str,
    limit: usize,
) -> Vec<MemoryItem> {
    let wanted = keywords(query);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<(usize, &MemoryItem)> = items
        .into_iter()
        .filter_map(|item| {
            let text = item.text().to_lowercase();
            let matched = wanted.iter().filter(|k| text.contains(k.as_str())).count();
            (matched > 0).then_some((matched, item))
        })
        .collect();

    hits.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.timestamp.cmp(&a.1.timestamp))
    });
    hits.into_iter().take(limit).map(|(_, item)| item.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use recall_core::layer::MemoryLayer;

    #[test]
    fn keywords_drop_short_words_and_duplicates() {
        assert_eq!(
            keywords("Why did we pick JWT? JWT is on the auth path"),
            vec!["why", "did", "pick", "jwt", "the", "auth", "path"]
        );
    }

    #[test]
    fn select_ranks_by_overlap_then_recency() {
        let now = Utc::now();
        let items = vec![
            MemoryItem::new(MemoryLayer::Project, "auth uses JWT").with_timestamp(now - Duration::days(3)),
            MemoryItem::new(MemoryLayer::Project, "auth refresh").with_timestamp(now),
            MemoryItem::new(MemoryLayer::Project, "unrelated note"),
        ];
        let hits = select(&items, "JWT auth", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text(), "auth uses JWT");
        assert_eq!(hits[1].text(), "auth refresh");
    }

    #[test]
    fn select_respects_limit_and_empty_query() {
        let items: Vec<_> = (0..5)
            .map(|i| MemoryItem::new(MemoryLayer::Session, format!("token note {i}")))
            .collect();
        assert_eq!(select(&items, "token", 3).len(), 3);
        assert!(select(&items, "a b", 3).is_empty());
    }
}
