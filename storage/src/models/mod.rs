//! Persistence models: keyword rules and logged inquiries.

mod keyword_rule;
mod message_record;

pub use keyword_rule::{KeywordGroup, KeywordRule};
pub use message_record::{MessageRecord, NewInquiry};
