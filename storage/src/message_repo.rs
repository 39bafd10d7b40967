//! Message repository: the inquiry log and similarity candidate pool.
//!
//! Table `messages(id, messageText, embedding BLOB, embeddingDim, messageSender, roomTopic,
//! response, createdAt)`. Ids are SQLite rowids and increase monotonically.

use crate::error::StorageError;
use crate::models::{MessageRecord, NewInquiry};
use crate::sqlite_pool::SqlitePoolManager;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use tracing::{info, warn};

const SELECT_COLUMNS: &str = "SELECT id, messageText, embedding, embeddingDim, messageSender, \
     roomTopic, response, createdAt FROM messages";

#[derive(Clone)]
pub struct MessageRepository {
    pool_manager: SqlitePoolManager,
}

impl MessageRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::from_pool(pool_manager).await
    }

    /// Shares an existing pool (e.g. with [`crate::KeywordRepository`]).
    pub async fn from_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                messageText TEXT NOT NULL,
                embedding BLOB,
                embeddingDim INTEGER,
                messageSender TEXT NOT NULL,
                roomTopic TEXT NOT NULL,
                response TEXT,
                createdAt TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_response ON messages(response)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Appends an inquiry and returns its id.
    pub async fn log_inquiry(&self, inquiry: NewInquiry<'_>) -> Result<i64, StorageError> {
        let blob = inquiry.embedding.map(|e| e.to_be_bytes());
        let dimension = inquiry.embedding.map(|e| e.dimension() as i64);

        let result = sqlx::query(
            r#"
            INSERT INTO messages (messageText, embedding, embeddingDim, messageSender, roomTopic, response, createdAt)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(inquiry.text)
        .bind(blob)
        .bind(dimension)
        .bind(inquiry.sender)
        .bind(inquiry.room_topic)
        .bind(inquiry.response)
        .bind(Utc::now())
        .execute(self.pool_manager.pool())
        .await?;

        let id = result.last_insert_rowid();
        info!(
            inquiry_id = id,
            sender = %inquiry.sender,
            room = %inquiry.room_topic,
            answered = inquiry.response.is_some(),
            "Logged inquiry"
        );
        Ok(id)
    }

    /// Sets the response of record `id`. Fails with `NotFound` if no such record exists.
    pub async fn record_response(&self, id: i64, response: &str) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE messages SET response = ? WHERE id = ?")
            .bind(response)
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("message {id}")));
        }
        info!(inquiry_id = id, "Recorded response");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<MessageRecord>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        row.as_ref().map(MessageRecord::from_row).transpose()
    }

    /// Similarity candidates: answered records with a decodable embedding, minus `exclude`.
    ///
    /// Rows whose blob fails to decode (wrong length, dimension mismatch) are skipped with a warning.
    pub async fn list_answered(&self, exclude: &[i64]) -> Result<Vec<MessageRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE response IS NOT NULL AND response != '' \
             AND embedding IS NOT NULL ORDER BY id ASC"
        ))
        .fetch_all(self.pool_manager.pool())
        .await?;

        Ok(decode_rows(&rows)
            .into_iter()
            .filter(|record| !exclude.contains(&record.id) && record.embedding.is_some())
            .collect())
    }

    /// Most recent records first.
    pub async fn list_recent(
        &self,
        limit: u32,
        answered_only: bool,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        let filter = if answered_only {
            " WHERE response IS NOT NULL AND response != ''"
        } else {
            ""
        };
        let rows = sqlx::query(&format!("{SELECT_COLUMNS}{filter} ORDER BY id DESC LIMIT ?"))
            .bind(i64::from(limit))
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(decode_rows(&rows))
    }
}

fn decode_rows(rows: &[SqliteRow]) -> Vec<MessageRecord> {
    rows.iter()
        .filter_map(|row| match MessageRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable message record");
                None
            }
        })
        .collect()
}
