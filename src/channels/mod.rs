//! Channel abstraction for outbound replies.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramConfig};

use async_trait::async_trait;

use crate::error::ChannelError;

/// A messaging surface the bot can reply on.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name.
    fn name(&self) -> &str;

    /// Whether the channel has credentials to send anything.
    fn is_configured(&self) -> bool;

    /// Send `text` to `chat_id`, splitting as the platform requires.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError>;

    /// Check if the channel is reachable with its current credentials.
    async fn health_check(&self) -> Result<(), ChannelError>;
}
