//! Bot abstraction for outbound chat traffic.
//!
//! [`Bot`] is transport-agnostic; dbot-telegram implements it via teloxide and tests substitute recorders.

use crate::error::Result;
use crate::types::{Chat, Message};
use async_trait::async_trait;

/// Outbound surface the resolution engine needs from a chat platform.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;

    /// Replies in place to the given message (same chat).
    async fn reply_to(&self, message: &Message, text: &str) -> Result<()> {
        self.send_message(&message.chat, text).await
    }

    /// Sends a text message to the room whose topic (title) equals `topic`.
    /// Returns `Ok(false)` when no such room is known to the transport.
    async fn send_to_room(&self, topic: &str, text: &str) -> Result<bool>;
}
