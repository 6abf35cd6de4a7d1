//! Notion document store — creates one database page per classified item.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use super::traits::DocumentStore;
use crate::categorize::{ClassifiedItem, ItemDetails};
use crate::error::StoreError;

/// Default Notion API base URL.
pub const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";

/// API version pinned in every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Notion rejects rich text segments longer than this.
const MAX_TEXT_LENGTH: usize = 2000;

const STORE: &str = "notion";

/// Connection settings for the Notion API.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    /// Integration token; writes fail with `NotConfigured` without one.
    pub api_key: Option<SecretString>,
    pub api_base: String,
    pub timeout: Duration,
}

/// Title property attempts, in order. Databases name their title column
/// differently; the last attempt lets Notion create an untitled page.
const TITLE_PROPERTIES: [Option<&str>; 3] = [Some("Name"), Some("Title"), None];

pub struct NotionStore {
    client: Client,
    api_key: Option<SecretString>,
    api_base: String,
}

impl NotionStore {
    pub fn new(config: &NotionConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::WriteFailed {
                destination: "-".into(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn pages_url(&self) -> String {
        format!("{}/v1/pages", self.api_base)
    }

    async fn create_page(
        &self,
        api_key: &SecretString,
        destination: &str,
        body: &Value,
    ) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(self.pages_url())
            .bearer_auth(api_key.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::WriteFailed {
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            store: STORE.into(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for NotionStore {
    fn name(&self) -> &str {
        STORE
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn write(&self, destination: &str, item: &ClassifiedItem) -> Result<(), StoreError> {
        let Some(api_key) = &self.api_key else {
            return Err(StoreError::NotConfigured {
                store: STORE.into(),
            });
        };

        let children = build_children(&item.details);
        let mut last_err = None;

        for title_property in TITLE_PROPERTIES {
            let body = build_page_body(destination, title_property, &item.text, &children);
            match self.create_page(api_key, destination, &body).await {
                Ok(()) => {
                    tracing::info!(
                        destination,
                        category = item.category.as_str(),
                        title_property = title_property.unwrap_or("<none>"),
                        "Notion page created"
                    );
                    return Ok(());
                }
                // Only a validation error can mean "no such title property".
                Err(e @ StoreError::Rejected { status: 400, .. }) => {
                    tracing::warn!(
                        destination,
                        title_property = title_property.unwrap_or("<none>"),
                        error = %e,
                        "Notion rejected page, trying next title property"
                    );
                    last_err = Some(e);
                }
                Err(e) => {
                    tracing::warn!(
                        destination,
                        title_property = title_property.unwrap_or("<none>"),
                        error = %e,
                        "Notion page create failed"
                    );
                    return Err(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| StoreError::WriteFailed {
            destination: destination.to_string(),
            reason: "no attempt made".into(),
        }))
    }
}

/// Request body for `POST /v1/pages`.
fn build_page_body(
    destination: &str,
    title_property: Option<&str>,
    text: &str,
    children: &[Value],
) -> Value {
    let mut properties = serde_json::Map::new();
    if let Some(name) = title_property {
        properties.insert(name.to_string(), json!({ "title": rich_text(text) }));
    }

    let mut body = json!({
        "parent": { "database_id": destination },
        "properties": properties,
    });
    if !children.is_empty() {
        body["children"] = json!(children);
    }
    body
}

/// Page content blocks for whatever details the classifier extracted.
fn build_children(details: &ItemDetails) -> Vec<Value> {
    let mut blocks = Vec::new();

    for task in details.tasks.iter().filter(|t| !t.trim().is_empty()) {
        blocks.push(json!({
            "object": "block",
            "type": "to_do",
            "to_do": { "rich_text": rich_text(task), "checked": false }
        }));
    }
    for idea in details.ideas.iter().filter(|i| !i.trim().is_empty()) {
        blocks.push(json!({
            "object": "block",
            "type": "bulleted_list_item",
            "bulleted_list_item": { "rich_text": rich_text(idea) }
        }));
    }
    if let Some(priority) = details.priority.as_deref().filter(|p| !p.is_empty()) {
        blocks.push(paragraph(&format!("Priority: {priority}")));
    }
    if let Some(deadline) = details.deadline.as_deref().filter(|d| !d.is_empty()) {
        blocks.push(paragraph(&format!("Deadline: {}", format_deadline(deadline))));
    }
    if !details.tags.is_empty() {
        blocks.push(paragraph(&format!("Tags: {}", details.tags.join(", "))));
    }

    blocks
}

/// ISO dates gain a weekday; anything else ("next week") passes through.
fn format_deadline(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d (%A)").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": rich_text(text) }
    })
}

fn rich_text(text: &str) -> Value {
    let content: String = text.chars().take(MAX_TEXT_LENGTH).collect();
    json!([{ "type": "text", "text": { "content": content } }])
}
