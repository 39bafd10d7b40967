//! Keyword repository: the keyword-rule store.
//!
//! Rules live in `keywords(id, keyword, keywordResponse)`; `keyword` is the comma-joined group.
//! Matching scans rules in id order and the first fully-matching rule wins.

use crate::error::StorageError;
use crate::models::{KeywordGroup, KeywordRule};
use crate::sqlite_pool::SqlitePoolManager;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::{debug, info};

/// What `remove_term` did to the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    TermRemoved,
    /// The group became empty so the rule was deleted.
    RuleDeleted,
}

#[derive(Clone)]
pub struct KeywordRepository {
    pool_manager: SqlitePoolManager,
}

impl KeywordRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::from_pool(pool_manager).await
    }

    /// Shares an existing pool (e.g. with [`crate::MessageRepository`]).
    pub async fn from_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword TEXT NOT NULL,
                keywordResponse TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    /// Inserts a rule and returns its id.
    pub async fn add_rule(&self, group: &KeywordGroup, response: &str) -> Result<i64, StorageError> {
        let result = sqlx::query("INSERT INTO keywords (keyword, keywordResponse) VALUES (?, ?)")
            .bind(group.to_column())
            .bind(response)
            .execute(self.pool_manager.pool())
            .await?;

        let id = result.last_insert_rowid();
        info!(rule_id = id, keyword = %group.to_column(), "Added keyword rule");
        Ok(id)
    }

    pub async fn get_rule(&self, id: i64) -> Result<Option<KeywordRule>, StorageError> {
        let row = sqlx::query("SELECT id, keyword, keywordResponse FROM keywords WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        row.as_ref().map(rule_from_row).transpose()
    }

    /// All rules in storage order.
    pub async fn list_rules(&self) -> Result<Vec<KeywordRule>, StorageError> {
        let rows = sqlx::query("SELECT id, keyword, keywordResponse FROM keywords ORDER BY id ASC")
            .fetch_all(self.pool_manager.pool())
            .await?;
        rows.iter().map(rule_from_row).collect()
    }

    /// Appends one or more comma-separated terms to the rule's group.
    pub async fn append_term(&self, id: i64, term: &str) -> Result<KeywordRule, StorageError> {
        let mut rule = self.require_rule(id).await?;
        rule.group.extend(term);
        self.update_group(id, &rule.group).await?;
        info!(rule_id = id, keyword = %rule.group.to_column(), "Appended keyword term");
        Ok(rule)
    }

    /// Replaces the rule's response text.
    pub async fn set_response(&self, id: i64, response: &str) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE keywords SET keywordResponse = ? WHERE id = ?")
            .bind(response)
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("keyword rule {id}")));
        }
        info!(rule_id = id, "Updated keyword response");
        Ok(())
    }

    /// Removes `term` (case-insensitive) from the group; deletes the rule if nothing is left.
    pub async fn remove_term(&self, id: i64, term: &str) -> Result<RemoveOutcome, StorageError> {
        let mut rule = self.require_rule(id).await?;
        if !rule.group.remove(term) {
            return Err(StorageError::NotFound(format!(
                "term '{}' in keyword rule {id}",
                term.trim()
            )));
        }

        if rule.group.is_empty() {
            self.delete_rule(id).await?;
            return Ok(RemoveOutcome::RuleDeleted);
        }

        self.update_group(id, &rule.group).await?;
        info!(rule_id = id, keyword = %rule.group.to_column(), "Removed keyword term");
        Ok(RemoveOutcome::TermRemoved)
    }

    pub async fn delete_rule(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM keywords WHERE id = ?")
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("keyword rule {id}")));
        }
        info!(rule_id = id, "Deleted keyword rule");
        Ok(())
    }

    /// First rule (in storage order) whose every term occurs in `text` as a whole word.
    pub async fn find_match(&self, text: &str) -> Result<Option<KeywordRule>, StorageError> {
        let found = self
            .list_rules()
            .await?
            .into_iter()
            .find(|rule| rule.matches(text));
        if let Some(rule) = &found {
            debug!(rule_id = rule.id, "Keyword rule matched");
        }
        Ok(found)
    }

    async fn require_rule(&self, id: i64) -> Result<KeywordRule, StorageError> {
        self.get_rule(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("keyword rule {id}")))
    }

    async fn update_group(&self, id: i64, group: &KeywordGroup) -> Result<(), StorageError> {
        sqlx::query("UPDATE keywords SET keyword = ? WHERE id = ?")
            .bind(group.to_column())
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(())
    }
}

fn rule_from_row(row: &SqliteRow) -> Result<KeywordRule, StorageError> {
    let keyword: String = row.try_get("keyword")?;
    Ok(KeywordRule {
        id: row.try_get("id")?,
        group: KeywordGroup::parse(&keyword),
        response: row.try_get("keywordResponse")?,
    })
}
