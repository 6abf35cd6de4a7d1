//! `DocumentStore` trait — the single write interface for categorized items.

use async_trait::async_trait;

use crate::categorize::ClassifiedItem;
use crate::error::StoreError;

/// Backend-agnostic write-only store for classified items.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &str;

    /// Whether the store has the credentials it needs to write.
    fn is_configured(&self) -> bool;

    /// Write one item into `destination` (a database id for Notion).
    async fn write(&self, destination: &str, item: &ClassifiedItem) -> Result<(), StoreError>;
}
