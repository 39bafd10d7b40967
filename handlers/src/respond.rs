//! Respond command: persist an administrator reply and relay it to the original chat.

use crate::correlation::CorrelationTracker;
use crate::error::ResolveError;
use dbot_core::Bot;
use embedding::Language;
use std::sync::Arc;
use storage::MessageRepository;
use tracing::{error, info, instrument, warn};

/// Text relayed to the inquiry's chat. Annotated form quotes the original inquiry.
pub fn relay_text(language: Language, original: &str, reply: &str, annotate: bool) -> String {
    if !annotate {
        return reply.to_string();
    }
    match language {
        Language::En => format!("Responding to '{original}': {reply}"),
        Language::Zh => format!("响应：'{original}': {reply}"),
    }
}

/// Result of a successful respond command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Responded {
    pub inquiry_id: i64,
    /// False when relaying was not requested or the send failed.
    pub relayed: bool,
}

#[derive(Clone)]
pub struct Responder {
    messages: MessageRepository,
    tracker: Arc<dyn CorrelationTracker>,
    bot: Arc<dyn Bot>,
    annotate: bool,
}

impl Responder {
    pub fn new(
        messages: MessageRepository,
        tracker: Arc<dyn CorrelationTracker>,
        bot: Arc<dyn Bot>,
        annotate: bool,
    ) -> Self {
        Self {
            messages,
            tracker,
            bot,
            annotate,
        }
    }

    /// Claims the pending inquiry (`target` or the tracker's default), records `text` as its
    /// response, and relays the reply when `relay` is set.
    ///
    /// `NotFound` when nothing is pending. The claim is restored if persisting fails.
    #[instrument(skip(self, text))]
    pub async fn respond(
        &self,
        target: Option<i64>,
        text: &str,
        relay: bool,
    ) -> Result<Responded, ResolveError> {
        let pending = self.tracker.claim(target).ok_or_else(|| match target {
            Some(id) => ResolveError::NotFound(format!("pending inquiry {id}")),
            None => ResolveError::NotFound("no pending inquiry".to_string()),
        })?;

        if let Err(e) = self.messages.record_response(pending.id, text).await {
            warn!(inquiry_id = pending.id, error = %e, "Response not recorded, inquiry stays pending");
            self.tracker.restore(pending);
            return Err(e.into());
        }
        info!(inquiry_id = pending.id, "Response recorded");

        if !relay {
            return Ok(Responded {
                inquiry_id: pending.id,
                relayed: false,
            });
        }

        let message = relay_text(pending.language, &pending.text, text, self.annotate);
        let relayed = match self.bot.send_message(&pending.chat, &message).await {
            Ok(()) => true,
            Err(e) => {
                error!(inquiry_id = pending.id, error = %e, "Failed to relay response");
                false
            }
        };
        Ok(Responded {
            inquiry_id: pending.id,
            relayed,
        })
    }
}
