//! SQLite connection pool wrapper for the storage crate.

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Manages a single SQLite pool shared by the keyword and message repositories;
/// creates the database file if missing.
#[derive(Clone)]
pub struct SqlitePoolManager {
    pool: SqlitePool,
}

impl SqlitePoolManager {
    /// Creates a pool for the given database location. Accepts a plain file path or a
    /// `sqlite:` / `sqlite://` / `file:` prefixed path.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let path = database_path(database_url);
        info!("Initializing SQLite pool: {}", path);

        let options = SqliteConnectOptions::new()
            .create_if_missing(true)
            .filename(path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Strips a URL-style prefix so the remainder can be used as a file name.
fn database_path(database_url: &str) -> &str {
    ["sqlite://", "sqlite:", "file:"]
        .iter()
        .find_map(|prefix| database_url.strip_prefix(prefix))
        .unwrap_or(database_url)
}
