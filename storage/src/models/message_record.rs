//! Message log model.
//!
//! Maps to the `messages` table. The embedding is stored as a big-endian f32 blob with its
//! dimension in `embeddingDim`; rows whose blob does not decode are never handed out as
//! similarity candidates.

use chrono::{DateTime, Utc};
use embedding::Embedding;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};

use crate::error::StorageError;

/// A logged inquiry and, once an administrator replied, its response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: i64,
    pub text: String,
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    pub sender: String,
    pub room_topic: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// True when a non-empty response has been recorded.
    pub fn is_answered(&self) -> bool {
        self.response.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        let id: i64 = row.try_get("id")?;
        let blob: Option<Vec<u8>> = row.try_get("embedding")?;
        let dimension: Option<i64> = row.try_get("embeddingDim")?;

        let embedding = match blob {
            Some(bytes) if !bytes.is_empty() => Some(decode_embedding(id, &bytes, dimension)?),
            _ => None,
        };

        Ok(Self {
            id,
            text: row.try_get("messageText")?,
            embedding,
            sender: row.try_get("messageSender")?,
            room_topic: row.try_get("roomTopic")?,
            response: row.try_get("response")?,
            created_at: row.try_get("createdAt")?,
        })
    }
}

fn decode_embedding(
    id: i64,
    bytes: &[u8],
    dimension: Option<i64>,
) -> Result<Embedding, StorageError> {
    let embedding = Embedding::from_be_bytes(bytes)
        .map_err(|e| StorageError::Decode(format!("message {id}: {e}")))?;
    match dimension {
        Some(dim) if dim != embedding.dimension() as i64 => Err(StorageError::Decode(format!(
            "message {id}: stored dimension {dim} does not match blob of {} floats",
            embedding.dimension()
        ))),
        _ => Ok(embedding),
    }
}

/// Input for [`crate::MessageRepository::log_inquiry`].
#[derive(Debug, Clone, Copy)]
pub struct NewInquiry<'a> {
    pub text: &'a str,
    pub sender: &'a str,
    pub room_topic: &'a str,
    pub embedding: Option<&'a Embedding>,
    /// Set when the inquiry is logged after it was already answered.
    pub response: Option<&'a str>,
}

impl<'a> NewInquiry<'a> {
    pub fn new(text: &'a str, sender: &'a str, room_topic: &'a str) -> Self {
        Self {
            text,
            sender,
            room_topic,
            embedding: None,
            response: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Option<&'a Embedding>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_response(mut self, response: &'a str) -> Self {
        self.response = Some(response);
        self
    }
}
