//! Wraps teloxide::Bot and implements [`dbot_core::Bot`]. Production code sends messages via Telegram; tests can substitute another Bot impl.

use crate::room_directory::RoomDirectory;
use async_trait::async_trait;
use dbot_core::{Bot as CoreBot, Chat, DbotError, Result};
use std::sync::Arc;
use teloxide::{prelude::*, types::ChatId};
use tracing::warn;

/// Thin wrapper around teloxide::Bot that implements dbot-core's Bot trait.
/// Room-by-topic sends resolve through the shared [`RoomDirectory`].
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
    rooms: Arc<RoomDirectory>,
}

impl TelegramBotAdapter {
    pub fn new(bot: teloxide::Bot, rooms: Arc<RoomDirectory>) -> Self {
        Self { bot, rooms }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }

    pub fn rooms(&self) -> &Arc<RoomDirectory> {
        &self.rooms
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .await
            .map_err(|e| DbotError::Bot(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.send(chat.id, text).await
    }

    async fn send_to_room(&self, topic: &str, text: &str) -> Result<bool> {
        let Some(chat_id) = self.rooms.lookup(topic) else {
            warn!(topic = %topic, "No chat known for room topic");
            return Ok(false);
        };
        self.send(chat_id, text).await?;
        Ok(true)
    }
}
