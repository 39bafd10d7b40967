//! # Handlers
//!
//! The support bot's resolution engine:
//!
//! - [`command`]: chat-text command parser ([`Command`], [`CommandSyntax`])
//! - [`pipeline`]: exact → similarity → escalation ([`ResolutionPipeline`])
//! - [`correlation`]: pending inquiries awaiting an administrator ([`CorrelationTracker`])
//! - [`respond`]: administrator reply persistence and relay ([`Responder`])
//! - [`dispatcher`]: routing of inbound messages ([`SupportHandler`])
//! - [`LoggingHandler`]: request/response logging around the chain

pub mod command;
pub mod correlation;
pub mod dispatcher;
mod error;
mod logging;
pub mod mention;
pub mod pipeline;
pub mod respond;

#[cfg(test)]
mod test;

pub use command::{Command, CommandSyntax};
pub use correlation::{CorrelationTracker, PendingInquiry, RoomQueueTracker, SingleSlotTracker};
pub use dispatcher::{Route, SupportHandler, SupportSettings};
pub use error::ResolveError;
pub use logging::LoggingHandler;
pub use pipeline::{
    escalation_ack, EscalationSettings, Inquiry, PipelineOutcome, Resolution, ResolutionPipeline,
};
pub use respond::{relay_text, Responded, Responder};
