//! Message categorization.
//!
//! Free text comes in, a non-empty list of categorized items comes out:
//! 1. `KeywordClassifier` — ordered substring rules, no I/O
//! 2. `LlmClassifier` — model-driven split + categorize, falls back on any failure
//! 3. `Categorizer` — picks one of the two once, from `ClassifierMode`

pub mod extract;
pub mod keyword;
pub mod llm;

pub use extract::{Extraction, extract_json_object};
pub use keyword::KeywordClassifier;
pub use llm::{LlmClassifier, LlmFallback};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{BotConfig, ClassifierMode};
use crate::error::LlmError;
use crate::llm::create_provider;

// ── Category ────────────────────────────────────────────────────────

/// Where a classified item belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Todo,
    Shopping,
    Projects,
    Personal,
    BrainDump,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Todo,
        Category::Shopping,
        Category::Projects,
        Category::Personal,
        Category::BrainDump,
    ];

    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Shopping => "shopping",
            Self::Projects => "projects",
            Self::Personal => "personal",
            Self::BrainDump => "brain_dump",
        }
    }

    /// Resolve a category name, accepting the vocabulary older prompts used.
    ///
    /// Returns `None` for names outside the known vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "todo" | "todos" | "tasks" | "task" => Some(Self::Todo),
            "shopping" | "shop" | "groceries" => Some(Self::Shopping),
            "projects" | "project" | "work" => Some(Self::Projects),
            "personal" => Some(Self::Personal),
            "brain_dump" | "braindump" | "ideas" | "idea" | "general" | "notes" | "note" => {
                Some(Self::BrainDump)
            }
            _ => None,
        }
    }

    /// Like [`Category::from_name`], but unknown names land in `BrainDump`.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or(Self::BrainDump)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Todo => "📝",
            Self::Shopping => "🛒",
            Self::Projects => "💼",
            Self::Personal => "👤",
            Self::BrainDump => "🧠",
        }
    }

    /// Human label: "brain_dump" → "Brain Dump".
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Items ───────────────────────────────────────────────────────────

/// Structured extras the single-item model shape can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ideas: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl ItemDetails {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
            && self.ideas.is_empty()
            && self.tags.is_empty()
            && self.priority.is_none()
            && self.deadline.is_none()
    }
}

/// One routed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub text: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "ItemDetails::is_empty")]
    pub details: ItemDetails,
}

impl ClassifiedItem {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
            details: ItemDetails::default(),
        }
    }

    pub fn with_details(mut self, details: ItemDetails) -> Self {
        self.details = details;
        self
    }
}

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Keyword-only mode.
    Keyword,
    /// The model answered and its output parsed.
    Llm,
    /// The model path failed; keyword rules took over.
    KeywordFallback,
    /// The model path failed; trigger-word rule took over.
    TriggerWordFallback,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Llm => "llm",
            Self::KeywordFallback => "keyword_fallback",
            Self::TriggerWordFallback => "trigger_word_fallback",
        }
    }
}

/// Items produced for one inbound message. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    items: Vec<ClassifiedItem>,
    source: ClassificationSource,
}

impl ClassificationResult {
    /// Build a result, substituting a single `BrainDump` item wrapping
    /// `original` when `items` is empty.
    pub fn new(items: Vec<ClassifiedItem>, source: ClassificationSource, original: &str) -> Self {
        let items = if items.is_empty() {
            vec![ClassifiedItem::new(original, Category::BrainDump)]
        } else {
            items
        };
        Self { items, source }
    }

    pub fn items(&self) -> &[ClassifiedItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ClassifiedItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn source(&self) -> ClassificationSource {
        self.source
    }

    pub(crate) fn with_source(mut self, source: ClassificationSource) -> Self {
        self.source = source;
        self
    }
}

// ── Service ─────────────────────────────────────────────────────────

enum Classifier {
    Keyword(KeywordClassifier),
    Llm(LlmClassifier),
}

/// Entry point used by the webhook handler.
pub struct Categorizer {
    classifier: Classifier,
}

impl Categorizer {
    pub fn keyword_only() -> Self {
        Self {
            classifier: Classifier::Keyword(KeywordClassifier::new()),
        }
    }

    pub fn with_llm(classifier: LlmClassifier) -> Self {
        Self {
            classifier: Classifier::Llm(classifier),
        }
    }

    /// Build the classifier the config asks for, creating the LLM provider
    /// when one is configured.
    pub fn from_config(config: &BotConfig) -> Result<Self, LlmError> {
        match &config.llm {
            Some(llm_config) => {
                let provider = create_provider(llm_config)?;
                Ok(Self::with_llm(LlmClassifier::new(provider, config.llm_fallback)))
            }
            None => Ok(Self::keyword_only()),
        }
    }

    pub fn mode(&self) -> ClassifierMode {
        match self.classifier {
            Classifier::Keyword(_) => ClassifierMode::KeywordOnly,
            Classifier::Llm(_) => ClassifierMode::LlmWithFallback,
        }
    }

    /// LLM backend name, when one is in use.
    pub fn llm_provider(&self) -> Option<&str> {
        match &self.classifier {
            Classifier::Keyword(_) => None,
            Classifier::Llm(llm) => Some(llm.provider_name()),
        }
    }

    /// Classify `text`. Always yields at least one item.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        match &self.classifier {
            Classifier::Keyword(keyword) => keyword.classify(text),
            Classifier::Llm(llm) => llm.classify(text).await,
        }
    }
}
