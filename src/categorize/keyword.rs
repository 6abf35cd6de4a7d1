//! Keyword classifier — splits a message into items and tags each one by
//! ordered substring rules.
//!
//! Rule order is significant: the first matching rule wins, so
//! "call the store" is shopping, not personal.

use tracing::debug;

use super::{Category, ClassificationResult, ClassificationSource, ClassifiedItem};

/// A category and the substrings that select it.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
}

/// Rules in evaluation order.
pub const DEFAULT_RULES: [KeywordRule; 4] = [
    KeywordRule {
        category: Category::Shopping,
        keywords: &["buy", "shopping", "store", "groceries", "get", "pick up"],
    },
    KeywordRule {
        category: Category::Projects,
        keywords: &[
            "project",
            "work",
            "deadline",
            "meeting",
            "report",
            "presentation",
        ],
    },
    KeywordRule {
        category: Category::Personal,
        keywords: &[
            "call", "mom", "dad", "family", "self", "personal", "gym", "doctor", "exercise",
        ],
    },
    KeywordRule {
        category: Category::Todo,
        keywords: &[
            "todo", "task", "do", "finish", "complete", "pay", "send", "email",
        ],
    },
];

const AND_SEPARATOR: &str = " and ";
const COMMA_SEPARATOR: &str = ", ";

/// Deterministic classifier with no external dependencies.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
        }
    }

    /// Split, trim, and categorize every part of `text`.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let items: Vec<ClassifiedItem> = split_candidates(text)
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| ClassifiedItem::new(part, self.categorize(part)))
            .collect();

        debug!(items = items.len(), "Keyword classification complete");
        ClassificationResult::new(items, ClassificationSource::Keyword, text)
    }

    /// Category for a single item of text.
    pub fn categorize(&self, part: &str) -> Category {
        let lower = part.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw)))
            .map(|rule| rule.category)
            .unwrap_or(Category::BrainDump)
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidate items, before trimming.
///
/// `" and "` is detected case-insensitively but split literally, so
/// "eggs AND milk" stays one item.
fn split_candidates(text: &str) -> Vec<&str> {
    if text.to_lowercase().contains(AND_SEPARATOR) {
        text.split(AND_SEPARATOR).collect()
    } else if text.contains(COMMA_SEPARATOR) {
        text.split(COMMA_SEPARATOR).collect()
    } else {
        vec![text]
    }
}
