//! Best-effort extraction of a JSON object from free-form model output.
//!
//! Models are asked for bare JSON but often wrap it in a fenced block or
//! surround it with commentary. Extraction never errors: it reports
//! `Extraction::Failed` so the caller can take its fallback path.

use std::fmt;

/// Why no JSON object could be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// Input was empty or whitespace.
    Empty,
    /// No `{` anywhere in the input.
    NoObject,
    /// An opening `{` with no `}` after it.
    Unterminated,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty model output"),
            Self::NoObject => f.write_str("no JSON object in model output"),
            Self::Unterminated => f.write_str("unbalanced braces in model output"),
        }
    }
}

/// Result of [`extract_json_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction<'a> {
    Found(&'a str),
    Failed(ExtractionFailure),
}

/// Locate the JSON object inside `text`.
///
/// Order: a ```` ```json ```` fence, then any fence whose body starts with
/// `{`, then the span from the first `{` to the last `}`. The returned slice
/// is only located, not validated.
pub fn extract_json_object(text: &str) -> Extraction<'_> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Extraction::Failed(ExtractionFailure::Empty);
    }

    if let Some(inner) = fenced_body(trimmed, "```json")
        && inner.starts_with('{')
    {
        return Extraction::Found(inner);
    }

    if let Some(inner) = fenced_body(trimmed, "```")
        && inner.starts_with('{')
    {
        return Extraction::Found(inner);
    }

    let Some(start) = trimmed.find('{') else {
        return Extraction::Failed(ExtractionFailure::NoObject);
    };
    match trimmed.rfind('}') {
        Some(end) if end > start => Extraction::Found(&trimmed[start..=end]),
        _ => Extraction::Failed(ExtractionFailure::Unterminated),
    }
}

/// Body between `opener` and the next closing fence, trimmed.
fn fenced_body<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let after = &text[start..];
    let end = after.find("```")?;
    Some(after[..end].trim())
}
