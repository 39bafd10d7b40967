//! Core types: user, chat, message, handler response, and Handler trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identity (id, username, names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Human-facing name: "first last", falling back to the username, then the numeric id.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        match &self.username {
            Some(u) if !u.is_empty() => u.clone(),
            _ => self.id.to_string(),
        }
    }

    /// True if `identity` names this user, by username (leading `@` ignored, case-insensitive)
    /// or by display name.
    pub fn is_identified_by(&self, identity: &str) -> bool {
        let identity = identity.trim();
        if identity.is_empty() {
            return false;
        }
        let bare = identity.trim_start_matches('@');
        if let Some(username) = &self.username {
            if username.eq_ignore_ascii_case(bare) {
                return true;
            }
        }
        self.display_name() == identity
    }
}

/// Chat (room or private) identity. `title` is the room topic when the transport has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
    pub title: Option<String>,
}

impl Chat {
    /// Room topic, or `"No Room"` for chats without a title (private chats).
    pub fn topic(&self) -> &str {
        self.title.as_deref().unwrap_or(NO_ROOM_TOPIC)
    }
}

/// Topic recorded for messages that did not arrive in a titled room.
pub const NO_ROOM_TOPIC: &str = "No Room";

/// A single inbound message with sender, chat and text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
    /// True if the message was sent by the bot's own account.
    pub from_self: bool,
}

/// Handler result for the chain. `Reply(text)` carries the response body so later handlers can use it in `after()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; no response body.
    Stop,
    /// Skip this handler, try next.
    Ignore,
    /// Stop the chain and attach reply text.
    Reply(String),
}

/// Converts a transport-specific user type to core [`User`].
pub trait ToCoreUser: Send + Sync {
    fn to_core(&self) -> User;
}

/// Converts a transport-specific message type to core [`Message`].
pub trait ToCoreMessage: Send + Sync {
    fn to_core(&self) -> Message;
}

/// Single handler concept: optional before / handle / after. Chain runs all before → handle until Stop/Reply → all after (reverse).
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs before the handle phase. Return false to stop the chain.
    async fn before(&self, _message: &Message) -> crate::error::Result<bool> {
        Ok(true)
    }
    /// Processes the message. Return Stop or Reply to end the handle phase. Default: Continue.
    async fn handle(&self, _message: &Message) -> crate::error::Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    /// Runs after the handle phase (reverse order), with the final response.
    async fn after(
        &self,
        _message: &Message,
        _response: &HandlerResponse,
    ) -> crate::error::Result<()> {
        Ok(())
    }
}
