//! Persistence layer — writes categorized items to a document store.

pub mod notion;
pub mod traits;

pub use notion::{NotionConfig, NotionStore};
pub use traits::DocumentStore;
