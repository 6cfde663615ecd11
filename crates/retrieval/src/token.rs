//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! Close enough for budgeting context against BPE tokenizers on English
//! text and code, and keeps test budgets predictable.

use recall_core::item::{FusedItem, ScoredItem};

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 bytes. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimated cost of putting a scored item into the context.
pub fn estimate_item_tokens(item: &ScoredItem) -> usize {
    estimate_tokens(&item.text())
}

/// Estimated cost of a slice of fused items.
pub fn estimate_fused_tokens(items: &[FusedItem]) -> usize {
    items.iter().map(|i| estimate_tokens(&i.text())).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::item::MemoryItem;
    use recall_core::layer::MemoryLayer;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 25);
    }

    #[test]
    fn structured_content_is_costed_as_json() {
        let item = ScoredItem::new(
            MemoryItem::new(MemoryLayer::Graph, serde_json::json!({"a": 1})),
            0.5,
        );
        // {"a":1} is 7 bytes
        assert_eq!(estimate_item_tokens(&item), 2);
    }

    #[test]
    fn fused_items_sum() {
        let items: Vec<FusedItem> = ["test", "hello"]
            .into_iter()
            .map(|t| ScoredItem::new(MemoryItem::new(MemoryLayer::User, t), 1.0).into())
            .collect();
        assert_eq!(estimate_fused_tokens(&items), 3);
    }
}
