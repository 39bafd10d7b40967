//! Room directory: room topic (chat title) to chat id.
//!
//! Telegram has no lookup-by-title, so rooms are learned from inbound messages and from
//! `ROOM_IDS` (`topic=chat_id;topic=chat_id`).

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<String, i64>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory pre-registered with `entries`.
    pub fn with_rooms(entries: impl IntoIterator<Item = (String, i64)>) -> Self {
        let directory = Self::new();
        for (topic, chat_id) in entries {
            directory.register(&topic, chat_id);
        }
        directory
    }

    /// Records (or updates) the chat id for `topic`. Titles are unique per directory; the latest
    /// chat seen with a title wins.
    pub fn register(&self, topic: &str, chat_id: i64) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if rooms.insert(topic.to_string(), chat_id) != Some(chat_id) {
            debug!(topic = %topic, chat_id, "Registered room");
        }
    }

    pub fn lookup(&self, topic: &str) -> Option<i64> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses `topic=chat_id;topic=chat_id`. Empty input yields no entries.
pub fn parse_room_ids(raw: &str) -> Result<Vec<(String, i64)>> {
    let mut entries = Vec::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((topic, id)) = pair.rsplit_once('=') else {
            bail!("ROOM_IDS entry '{}' is not topic=chat_id", pair);
        };
        let topic = topic.trim();
        if topic.is_empty() {
            bail!("ROOM_IDS entry '{}' has an empty topic", pair);
        }
        let Ok(id) = id.trim().parse::<i64>() else {
            bail!("ROOM_IDS entry '{}' has a non-numeric chat id", pair);
        };
        entries.push((topic.to_string(), id));
    }
    Ok(entries)
}
