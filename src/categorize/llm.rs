//! LLM classifier — asks a model to split and categorize a message.
//!
//! Flow:
//! 1. Fixed rubric + raw message → one low-temperature completion
//! 2. Best-effort JSON extraction from the reply
//! 3. Parse either the multi-item or the single-item shape
//! 4. Any failure along the way → configured fallback, never an error

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::extract::{Extraction, ExtractionFailure, extract_json_object};
use super::{
    Category, ClassificationResult, ClassificationSource, ClassifiedItem, ItemDetails,
    KeywordClassifier,
};
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Max tokens for the classification call.
const CLASSIFY_MAX_TOKENS: u64 = 1000;

/// Low temperature: the same message should land in the same place.
const CLASSIFY_TEMPERATURE: f64 = 0.3;

/// Words that mark a fallback item as something to act on.
pub const TRIGGER_WORDS: [&str; 5] = ["need", "buy", "do", "call", "remember"];

/// What to produce when the model path fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmFallback {
    /// Run the keyword classifier on the original text.
    #[default]
    KeywordClassifier,
    /// One item with the full text: `todo` if a trigger word appears,
    /// otherwise `brain_dump`.
    TriggerWords,
}

impl LlmFallback {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "keyword" | "keywords" | "keyword_classifier" => Some(Self::KeywordClassifier),
            "trigger" | "trigger_words" | "triggers" => Some(Self::TriggerWords),
            _ => None,
        }
    }
}

/// Why the model path was abandoned.
#[derive(Debug, thiserror::Error)]
enum ClassifyFailure {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    Extraction(ExtractionFailure),

    #[error("unusable model output: {0}")]
    Parse(String),
}

/// Model-backed classifier with a guaranteed fallback.
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
    fallback: LlmFallback,
    keyword: KeywordClassifier,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, fallback: LlmFallback) -> Self {
        Self {
            llm,
            fallback,
            keyword: KeywordClassifier::new(),
        }
    }

    /// Backend behind this classifier ("anthropic", "openai").
    pub fn provider_name(&self) -> &str {
        self.llm.provider_name()
    }

    /// Classify `text`. Never fails; at least one item is always returned.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        match self.try_classify(text).await {
            Ok(items) => {
                debug!(
                    model = self.llm.model_name(),
                    items = items.len(),
                    "LLM classification complete"
                );
                ClassificationResult::new(items, ClassificationSource::Llm, text)
            }
            Err(e) => {
                warn!(
                    model = self.llm.model_name(),
                    error = %e,
                    fallback = ?self.fallback,
                    "LLM classification failed, using fallback"
                );
                self.fallback_result(text)
            }
        }
    }

    async fn try_classify(&self, text: &str) -> Result<Vec<ClassifiedItem>, ClassifyFailure> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_classify_system_prompt()),
            ChatMessage::user(text),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        if response.output_tokens >= CLASSIFY_MAX_TOKENS {
            warn!(
                model = self.llm.model_name(),
                output_tokens = response.output_tokens,
                "Model reply hit the token cap and may be truncated"
            );
        }
        parse_model_output(&response.content, text)
    }

    fn fallback_result(&self, text: &str) -> ClassificationResult {
        match self.fallback {
            LlmFallback::KeywordClassifier => self
                .keyword
                .classify(text)
                .with_source(ClassificationSource::KeywordFallback),
            LlmFallback::TriggerWords => trigger_word_result(text),
        }
    }
}

/// Single item carrying the full text; `todo` when a trigger word appears.
pub fn trigger_word_result(text: &str) -> ClassificationResult {
    let lower = text.to_lowercase();
    let category = if TRIGGER_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Todo
    } else {
        Category::BrainDump
    };
    ClassificationResult::new(
        vec![ClassifiedItem::new(text, category)],
        ClassificationSource::TriggerWordFallback,
        text,
    )
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classify_system_prompt() -> String {
    "You are a smart task categorizer. Analyze the user's message and:\n\
     1. Break it down into individual tasks/items\n\
     2. Categorize each item into one of these categories:\n\
     - todo: General tasks, to-do items\n\
     - shopping: Items to buy, shopping lists\n\
     - projects: Project-related tasks, work items\n\
     - personal: Personal development, self-improvement, calls to family/friends\n\
     - brain_dump: Ideas, thoughts, notes, anything that doesn't fit other categories\n\n\
     Respond with ONLY a JSON object:\n\
     {\"items\": [{\"text\": \"the task or item\", \"category\": \"category_name\"}]}\n\n\
     If the message is one rich thought, you may instead respond with a single object:\n\
     {\"category\": \"category_name\", \"title\": \"short title\", \"cleaned_summary\": \"...\", \
     \"tasks\": [], \"ideas\": [], \"tags\": [], \"priority\": \"low|medium|high\", \
     \"deadline\": \"YYYY-MM-DD or null\"}\n\n\
     Be concise but preserve the essential information."
        .to_string()
}

// ── Response parsing ────────────────────────────────────────────────

/// Either accepted reply shape; which one is decided by which fields are set.
///
/// Every field is a raw `Value`: models put numbers where strings belong and
/// objects where lists of strings belong, and one odd field must not cost
/// the whole answer.
#[derive(Debug, Deserialize)]
struct ModelResponse {
    #[serde(default)]
    items: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    cleaned_summary: Option<Value>,
    #[serde(default)]
    tasks: Option<Value>,
    #[serde(default)]
    ideas: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    deadline: Option<Value>,
}

fn parse_model_output(raw: &str, original: &str) -> Result<Vec<ClassifiedItem>, ClassifyFailure> {
    let json = match extract_json_object(raw) {
        Extraction::Found(json) => json,
        Extraction::Failed(reason) => return Err(ClassifyFailure::Extraction(reason)),
    };
    let response: ModelResponse = serde_json::from_str(json)
        .map_err(|e| ClassifyFailure::Parse(format!("JSON parse error: {e}")))?;

    if let Some(items) = response.items {
        let Value::Array(entries) = items else {
            return Err(ClassifyFailure::Parse("`items` is not a list".into()));
        };
        let items: Vec<ClassifiedItem> = entries.iter().filter_map(model_item).collect();
        if items.len() < entries.len() {
            debug!(
                dropped = entries.len() - items.len(),
                "Dropped model items without usable text"
            );
        }
        if items.is_empty() {
            return Err(ClassifyFailure::Parse("no usable items".into()));
        }
        return Ok(items);
    }

    if response.category.is_none() && response.title.is_none() && response.cleaned_summary.is_none()
    {
        return Err(ClassifyFailure::Parse("unrecognized JSON shape".into()));
    }

    let text = response
        .cleaned_summary
        .as_ref()
        .and_then(value_to_text)
        .or_else(|| response.title.as_ref().and_then(value_to_text))
        .or_else(|| non_blank(original))
        .ok_or_else(|| ClassifyFailure::Parse("no item text".into()))?;
    let details = ItemDetails {
        tasks: text_list(response.tasks.as_ref()),
        ideas: text_list(response.ideas.as_ref()),
        tags: text_list(response.tags.as_ref()),
        priority: response.priority.as_ref().and_then(value_to_text),
        deadline: response.deadline.as_ref().and_then(value_to_text),
    };

    Ok(vec![
        ClassifiedItem::new(text, category_of(response.category.as_ref())).with_details(details),
    ])
}

/// One entry of the multi-item shape; entries without usable text are skipped.
fn model_item(entry: &Value) -> Option<ClassifiedItem> {
    let text = entry.get("text").and_then(value_to_text)?;
    Some(ClassifiedItem::new(text, category_of(entry.get("category"))))
}

fn category_of(value: Option<&Value>) -> Category {
    let name = value.and_then(value_to_text).unwrap_or_default();
    Category::from_name_or_default(&name)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Scalars become text; an object yields its first textual field
/// (`{"task": "x"}` → "x"); lists and null yield nothing.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(fields) => fields.values().find_map(value_to_text),
        Value::Array(_) | Value::Null => None,
    }
}

/// A list of texts; a lone scalar counts as a one-element list.
fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(values)) => values.iter().filter_map(value_to_text).collect(),
        Some(other) => value_to_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::llm::provider::CompletionResponse;

    /// Mock LLM that returns a fixed response and records the last request.
    struct MockClassifyLlm {
        response: Result<String, ()>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl MockClassifyLlm {
        fn replying(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(response.to_string()),
                last_request: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockClassifyLlm {
        fn provider_name(&self) -> &str {
            "mock"
        }

        fn model_name(&self) -> &str {
            "mock-classify"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.last_request.lock().unwrap() = Some(request);
            match &self.response {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    fn classifier(llm: Arc<MockClassifyLlm>, fallback: LlmFallback) -> LlmClassifier {
        LlmClassifier::new(llm, fallback)
    }

    // ── Prompt ──────────────────────────────────────────────────────

    #[test]
    fn system_prompt_names_every_category() {
        let prompt = build_classify_system_prompt();
        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()), "missing {category}");
        }
        assert!(prompt.contains("\"items\""));
    }

    #[tokio::test]
    async fn request_uses_low_temperature_and_capped_tokens() {
        let llm = MockClassifyLlm::replying(r#"{"items": [{"text": "x", "category": "todo"}]}"#);
        let c = classifier(Arc::clone(&llm), LlmFallback::default());
        c.classify("buy milk").await;

        let request = llm.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].content, "buy milk");
    }

    // ── Successful parses ───────────────────────────────────────────

    #[tokio::test]
    async fn multi_item_response() {
        let llm = MockClassifyLlm::replying(
            r#"{"items": [
                {"text": "Buy milk", "category": "shopping"},
                {"text": "Call mom", "category": "personal"}
            ]}"#,
        );
        let result = classifier(llm, LlmFallback::default())
            .classify("buy milk and call mom")
            .await;

        assert_eq!(result.source(), ClassificationSource::Llm);
        assert_eq!(
            result.items(),
            &[
                ClassifiedItem::new("Buy milk", Category::Shopping),
                ClassifiedItem::new("Call mom", Category::Personal),
            ]
        );
    }

    #[tokio::test]
    async fn fenced_response_with_commentary() {
        let llm = MockClassifyLlm::replying(
            "Here's the breakdown:\n```json\n{\"items\": [{\"text\": \"Finish slides\", \"category\": \"projects\"}]}\n```\nLet me know!",
        );
        let result = classifier(llm, LlmFallback::default())
            .classify("finish slides")
            .await;
        assert_eq!(result.source(), ClassificationSource::Llm);
        assert_eq!(result.items()[0].category, Category::Projects);
    }

    #[tokio::test]
    async fn legacy_category_names_are_mapped() {
        let llm = MockClassifyLlm::replying(
            r#"{"items": [{"text": "a", "category": "tasks"}, {"text": "b", "category": "ideas"}, {"text": "c", "category": "astrology"}]}"#,
        );
        let result = classifier(llm, LlmFallback::default()).classify("a b c").await;
        let categories: Vec<Category> = result.items().iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![Category::Todo, Category::BrainDump, Category::BrainDump]
        );
    }

    #[tokio::test]
    async fn blank_items_are_dropped() {
        let llm = MockClassifyLlm::replying(
            r#"{"items": [{"text": "  ", "category": "todo"}, {"text": " pay rent ", "category": "todo"}, {"category": "todo"}]}"#,
        );
        let result = classifier(llm, LlmFallback::default()).classify("pay rent").await;
        assert_eq!(result.items(), &[ClassifiedItem::new("pay rent", Category::Todo)]);
    }

    #[tokio::test]
    async fn single_item_shape_carries_details() {
        let llm = MockClassifyLlm::replying(
            r#"{
                "category": "projects",
                "title": "Launch plan",
                "cleaned_summary": "Draft the launch plan for Q3",
                "tasks": ["outline", "  ", "review with team"],
                "ideas": ["teaser video"],
                "tags": ["launch"],
                "priority": "high",
                "deadline": "2026-11-01"
            }"#,
        );
        let result = classifier(llm, LlmFallback::default())
            .classify("need to draft the launch plan by nov 1, maybe a teaser video")
            .await;

        assert_eq!(result.source(), ClassificationSource::Llm);
        assert_eq!(result.len(), 1);
        let item = &result.items()[0];
        assert_eq!(item.text, "Draft the launch plan for Q3");
        assert_eq!(item.category, Category::Projects);
        assert_eq!(item.details.tasks, vec!["outline", "review with team"]);
        assert_eq!(item.details.ideas, vec!["teaser video"]);
        assert_eq!(item.details.tags, vec!["launch"]);
        assert_eq!(item.details.priority.as_deref(), Some("high"));
        assert_eq!(item.details.deadline.as_deref(), Some("2026-11-01"));
    }

    #[tokio::test]
    async fn single_item_shape_falls_back_to_title_then_original() {
        let llm = MockClassifyLlm::replying(
            r#"{"category": "todo", "title": "Renew passport", "cleaned_summary": "", "tasks": null, "priority": 2, "deadline": null}"#,
        );
        let result = classifier(llm, LlmFallback::default())
            .classify("renew passport")
            .await;
        assert_eq!(result.items()[0].text, "Renew passport");
        assert_eq!(result.items()[0].details.priority.as_deref(), Some("2"));
        assert!(result.items()[0].details.tasks.is_empty());

        let llm = MockClassifyLlm::replying(r#"{"category": "general"}"#);
        let result = classifier(llm, LlmFallback::default())
            .classify("  sky thoughts ")
            .await;
        assert_eq!(
            result.items(),
            &[ClassifiedItem::new("sky thoughts", Category::BrainDump)]
        );
    }

    #[tokio::test]
    async fn numeric_deadline_is_kept_as_text() {
        let llm = MockClassifyLlm::replying(
            r#"{"category": "todo", "title": "File taxes", "deadline": 20261101}"#,
        );
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify("file taxes")
            .await;
        assert_eq!(result.source(), ClassificationSource::Llm);
        assert_eq!(result.items()[0].details.deadline.as_deref(), Some("20261101"));
    }

    #[tokio::test]
    async fn off_type_item_does_not_sink_the_list() {
        let llm = MockClassifyLlm::replying(
            r#"{"items": [
                {"text": "Buy milk", "category": "shopping"},
                {"text": 42, "category": "todo"},
                {"text": ["nested"], "category": "todo"},
                "loose string"
            ]}"#,
        );
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify("buy milk")
            .await;
        assert_eq!(result.source(), ClassificationSource::Llm);
        assert_eq!(
            result.items(),
            &[
                ClassifiedItem::new("Buy milk", Category::Shopping),
                ClassifiedItem::new("42", Category::Todo),
            ]
        );
    }

    #[tokio::test]
    async fn object_list_entries_yield_their_text() {
        let llm = MockClassifyLlm::replying(
            r#"{"category": "projects", "title": "Site", "tasks": [{"task": "a"}, "b", {}], "tags": "web", "ideas": 7}"#,
        );
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify("site work")
            .await;
        assert_eq!(result.source(), ClassificationSource::Llm);
        let details = &result.items()[0].details;
        assert_eq!(details.tasks, vec!["a", "b"]);
        assert_eq!(details.tags, vec!["web"]);
        assert_eq!(details.ideas, vec!["7"]);
    }

    #[tokio::test]
    async fn items_that_are_not_a_list_fall_back() {
        let llm = MockClassifyLlm::replying(r#"{"items": "buy milk"}"#);
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify("buy milk")
            .await;
        assert_eq!(result.source(), ClassificationSource::KeywordFallback);
    }

    // ── Fallbacks ───────────────────────────────────────────────────

    #[tokio::test]
    async fn unbalanced_braces_fall_back_to_keywords() {
        let text = "buy milk and call mom";
        let llm = MockClassifyLlm::replying(r#"{"items": [{"text": "buy milk", "category": "shopping""#);
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify(text)
            .await;

        assert_eq!(result.source(), ClassificationSource::KeywordFallback);
        assert_eq!(result.items(), KeywordClassifier::new().classify(text).items());
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_keywords() {
        let text = "finish the quarterly report";
        let llm = MockClassifyLlm::replying("{items: nope}");
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify(text)
            .await;
        assert_eq!(result.source(), ClassificationSource::KeywordFallback);
        assert_eq!(
            result.items(),
            &[ClassifiedItem::new(text, Category::Projects)]
        );
    }

    #[tokio::test]
    async fn empty_item_list_falls_back() {
        let llm = MockClassifyLlm::replying(r#"{"items": []}"#);
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify("gym at 6")
            .await;
        assert_eq!(result.source(), ClassificationSource::KeywordFallback);
        assert_eq!(result.items()[0].category, Category::Personal);
    }

    #[tokio::test]
    async fn unknown_shape_falls_back() {
        let llm = MockClassifyLlm::replying(r#"{"answer": 42}"#);
        let result = classifier(llm, LlmFallback::KeywordClassifier)
            .classify("hello")
            .await;
        assert_eq!(result.source(), ClassificationSource::KeywordFallback);
    }

    #[tokio::test]
    async fn transport_error_falls_back() {
        let result = classifier(MockClassifyLlm::failing(), LlmFallback::KeywordClassifier)
            .classify("buy groceries, call mom")
            .await;
        assert_eq!(result.source(), ClassificationSource::KeywordFallback);
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn trigger_word_fallback_marks_actionable_text() {
        let text = "Remember to water the plants and check the mail";
        let result = classifier(MockClassifyLlm::failing(), LlmFallback::TriggerWords)
            .classify(text)
            .await;
        assert_eq!(result.source(), ClassificationSource::TriggerWordFallback);
        assert_eq!(result.items(), &[ClassifiedItem::new(text, Category::Todo)]);
    }

    #[tokio::test]
    async fn trigger_word_fallback_without_trigger_is_brain_dump() {
        let text = "lovely sunset tonight";
        let result = classifier(
            MockClassifyLlm::replying("no json here"),
            LlmFallback::TriggerWords,
        )
        .classify(text)
        .await;
        assert_eq!(
            result.items(),
            &[ClassifiedItem::new(text, Category::BrainDump)]
        );
    }

    #[tokio::test]
    async fn every_input_yields_at_least_one_item() {
        for fallback in [LlmFallback::KeywordClassifier, LlmFallback::TriggerWords] {
            for text in ["", "   ", "x", "a and b"] {
                let result = classifier(MockClassifyLlm::failing(), fallback)
                    .classify(text)
                    .await;
                assert!(!result.items().is_empty(), "{fallback:?} {text:?}");
            }
        }
    }

    #[test]
    fn fallback_names() {
        assert_eq!(
            LlmFallback::from_name("keyword"),
            Some(LlmFallback::KeywordClassifier)
        );
        assert_eq!(
            LlmFallback::from_name("TRIGGER_WORDS"),
            Some(LlmFallback::TriggerWords)
        );
        assert_eq!(LlmFallback::from_name("coin_flip"), None);
    }
}
