//! Rule backend: deterministic keyword patterns, no model required.
//!
//! Patterns are checked in order and the first match wins, so the more
//! specific intents (personal state, past decisions, code structure) are
//! tried before the broad procedural and factual phrasings. Matching is on
//! whole words, so "import" does not fire on "important".

use async_trait::async_trait;
use recall_core::classification::QueryType;
use recall_core::error::ClassificationError;

use super::{ClassifierBackend, IntentVerdict};
use crate::scoring::tokenize;

const MATCH_CONFIDENCE: f32 = 0.8;
const NO_MATCH_CONFIDENCE: f32 = 0.3;

enum Pattern {
    /// Any of these word sequences anywhere in the query. A trailing `*`
    /// makes a word match as a prefix.
    Phrase(&'static [&'static str]),
    /// The query's first word is one of these.
    Leading(&'static [&'static str]),
}

impl Pattern {
    fn find(&self, tokens: &[String]) -> Option<&'static str> {
        match self {
            Self::Phrase(phrases) => phrases.iter().copied().find(|p| contains_phrase(tokens, p)),
            Self::Leading(verbs) => {
                let first = tokens.first()?;
                verbs.iter().copied().find(|v| first.as_str() == *v)
            }
        }
    }
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(token, word)| word_matches(token, word)))
}

fn word_matches(token: &str, word: &str) -> bool {
    match word.strip_suffix('*') {
        Some(stem) => token.starts_with(stem),
        None => token == word,
    }
}

const RULES: &[(QueryType, Pattern)] = &[
    (
        QueryType::User,
        Pattern::Phrase(&["my preferred", "my preference", "my expertise", "i prefer", "my style"]),
    ),
    (
        QueryType::Historical,
        Pattern::Phrase(&["why did we", "why was", "why were", "decided", "decision", "chose"]),
    ),
    (
        QueryType::Architectural,
        Pattern::Phrase(&[
            "import",
            "imports",
            "imported",
            "importing",
            "depends on",
            "dependenc*",
            "call graph",
            "who uses",
            "calls into",
        ]),
    ),
    (
        QueryType::Procedural,
        Pattern::Leading(&[
            "continue", "implement", "add", "build", "fix", "refactor", "create", "write", "finish",
        ]),
    ),
    (
        QueryType::Factual,
        Pattern::Phrase(&["what is", "what are", "how does", "how do", "explain"]),
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBackend;

impl RuleBackend {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`detect`](ClassifierBackend::detect).
    pub fn verdict(&self, query: &str) -> IntentVerdict {
        let tokens = tokenize(query);
        for (query_type, pattern) in RULES {
            if let Some(hit) = pattern.find(&tokens) {
                return IntentVerdict {
                    query_type: Some(*query_type),
                    confidence: MATCH_CONFIDENCE,
                    reasoning: format!("matched '{hit}'"),
                };
            }
        }
        IntentVerdict {
            query_type: None,
            confidence: NO_MATCH_CONFIDENCE,
            reasoning: "no intent pattern matched".into(),
        }
    }
}

#[async_trait]
impl ClassifierBackend for RuleBackend {
    fn name(&self) -> &str {
        "rules"
    }

    async fn init(&self) -> Result<(), ClassificationError> {
        Ok(())
    }

    async fn detect(&self, query: &str) -> Result<IntentVerdict, ClassificationError> {
        Ok(self.verdict(query))
    }
}
