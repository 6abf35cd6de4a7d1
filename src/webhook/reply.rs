//! Reply text sent back to the sender.

use crate::categorize::{Category, ClassifiedItem};
use crate::config::ClassifierMode;

pub const UNAUTHORIZED_REPLY: &str = "⛔ Unauthorized. This bot is private.";

/// One classified item and whether its write succeeded.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item: ClassifiedItem,
    pub written: bool,
}

/// Per-item lines, then a summary, then the basic-mode footer.
pub fn format_reply(outcomes: &[ItemOutcome], mode: ClassifierMode) -> String {
    let mut reply = outcomes
        .iter()
        .map(|o| {
            if o.written {
                format!(
                    "{} {}: {}",
                    o.item.category.emoji(),
                    o.item.category.label(),
                    o.item.text
                )
            } else {
                format!("❌ Failed: {}", o.item.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let written = outcomes.iter().filter(|o| o.written).count();
    if written == outcomes.len() {
        reply.push_str("\n\n✅ All items added successfully!");
    } else if written > 0 {
        reply.push_str(&format!("\n\n⚠️ Added {written}/{} items", outcomes.len()));
    }

    if mode == ClassifierMode::KeywordOnly {
        reply.push_str("\n\n_📊 Using basic categorization_");
    }
    reply
}

/// What is doing the sorting, named for users: the LLM backend, or
/// keyword rules when there is none.
pub fn engine_label(llm_provider: Option<&str>) -> String {
    match llm_provider {
        Some("anthropic") => "Claude AI 🤖".to_string(),
        Some("openai") => "OpenAI 🤖".to_string(),
        Some(other) => format!("{other} 🤖"),
        None => "keyword rules 📊".to_string(),
    }
}

/// Reply for `/start` and `/help`.
pub fn usage_text(llm_provider: Option<&str>) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("{} {}", c.emoji(), c.label()))
        .collect::<Vec<_>>()
        .join("\n");
    let engine = engine_label(llm_provider);
    format!(
        "🧠 *Brain Dump Bot*\n\n\
         Send me whatever is on your mind and I'll file it in Notion.\n\
         Separate several thoughts with \"and\" or commas.\n\n\
         {categories}\n\n\
         Sorting with {engine}."
    )
}

pub fn unknown_command_text(command: &str) -> String {
    format!("🤷 Unknown command: {command}\nSend /help for usage.")
}
