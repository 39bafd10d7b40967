//! Storage crate: keyword rules and the inquiry message log on SQLite.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – KeywordGroup, KeywordRule, MessageRecord, NewInquiry
//! - [`keyword_repo`] – KeywordRepository (`keywords` table)
//! - [`message_repo`] – MessageRepository (`messages` table, big-endian embedding blobs)
//! - [`sqlite_pool`] – SqlitePoolManager

mod error;
mod keyword_repo;
mod message_repo;
mod models;
mod sqlite_pool;

pub use error::StorageError;
pub use keyword_repo::{KeywordRepository, RemoveOutcome};
pub use message_repo::MessageRepository;
pub use models::{KeywordGroup, KeywordRule, MessageRecord, NewInquiry};
pub use sqlite_pool::SqlitePoolManager;
