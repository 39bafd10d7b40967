//! Resolution pipeline: exact keyword stage, similarity stage, escalation.
//!
//! Stages short-circuit on the first hit. Storage and embedding failures inside a stage are
//! logged and treated as "no match" so the next stage still runs.

use crate::correlation::{CorrelationTracker, PendingInquiry};
use crate::error::ResolveError;
use crate::mention;
use dbot_core::{Bot, Chat, Message};
use embedding::{Embedding, EmbeddingService, Language};
use std::sync::Arc;
use storage::{KeywordRepository, MessageRepository, NewInquiry};
use tracing::{debug, error, info, instrument, warn};

/// An ordinary inquiry, normalised for lookup.
#[derive(Debug, Clone)]
pub struct Inquiry {
    /// Text used for lookup and logging (bot mention stripped).
    pub text: String,
    /// Text as received; forwarded verbatim on escalation.
    pub original: String,
    pub sender: String,
    pub language: Language,
    pub chat: Chat,
    /// True when the message @-mentions the bot.
    pub addressed: bool,
}

impl Inquiry {
    pub fn from_message(message: &Message, bot_handle: Option<&str>) -> Self {
        let (text, addressed) = match bot_handle {
            Some(handle) if mention::is_bot_mentioned(&message.content, handle) => {
                (mention::strip_mention(&message.content, handle), true)
            }
            _ => (message.content.trim().to_string(), false),
        };
        Self {
            language: Language::detect(&text),
            text,
            original: message.content.clone(),
            sender: message.user.display_name(),
            chat: message.chat.clone(),
            addressed,
        }
    }

    pub fn room_topic(&self) -> &str {
        self.chat.topic()
    }
}

/// How an inquiry was answered autonomously.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact { rule_id: i64, response: String },
    Similar { record_id: i64, score: f32, response: String },
}

impl Resolution {
    pub fn response(&self) -> &str {
        match self {
            Resolution::Exact { response, .. } | Resolution::Similar { response, .. } => response,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Answered {
        resolution: Resolution,
        /// Present when the similarity stage computed it.
        embedding: Option<Embedding>,
    },
    /// Forwarded to the escalation room. `inquiry_id` is `None` if logging failed.
    Escalated { inquiry_id: Option<i64> },
    /// Neither stage matched and the inquiry did not trigger escalation.
    Dropped { embedding: Option<Embedding> },
}

/// Escalation destination and requester acknowledgement.
#[derive(Debug, Clone, Default)]
pub struct EscalationSettings {
    /// Topic of the room unresolved inquiries are forwarded to.
    pub room: Option<String>,
    /// Tell the requester their question was forwarded.
    pub acknowledge: bool,
}

/// Acknowledgement sent to a requester whose inquiry was escalated.
pub fn escalation_ack(language: Language, sender: &str) -> String {
    match language {
        Language::En => format!(
            "Sorry {sender}, I can't answer that yet; I've forwarded it to an administrator."
        ),
        Language::Zh => format!("抱歉 {sender}，我回答不了这个问题，已转发给行政人员。"),
    }
}

#[derive(Clone)]
pub struct ResolutionPipeline {
    keywords: KeywordRepository,
    messages: MessageRepository,
    embeddings: Arc<dyn EmbeddingService>,
    tracker: Arc<dyn CorrelationTracker>,
    bot: Arc<dyn Bot>,
    escalation: EscalationSettings,
}

impl ResolutionPipeline {
    pub fn new(
        keywords: KeywordRepository,
        messages: MessageRepository,
        embeddings: Arc<dyn EmbeddingService>,
        tracker: Arc<dyn CorrelationTracker>,
        bot: Arc<dyn Bot>,
        escalation: EscalationSettings,
    ) -> Self {
        Self {
            keywords,
            messages,
            embeddings,
            tracker,
            bot,
            escalation,
        }
    }

    /// Runs the stages in order and returns the first outcome.
    #[instrument(skip(self, inquiry), fields(chat_id = inquiry.chat.id, language = %inquiry.language))]
    pub async fn resolve(&self, inquiry: &Inquiry) -> PipelineOutcome {
        if let Some(resolution) = self.exact_stage(inquiry).await {
            return PipelineOutcome::Answered {
                resolution,
                embedding: None,
            };
        }

        let embedding = self.embed(inquiry).await;
        if let Some(query) = &embedding {
            if let Some(resolution) = self.similarity_stage(inquiry, query).await {
                return PipelineOutcome::Answered {
                    resolution,
                    embedding,
                };
            }
        }

        if mention::wants_escalation(&inquiry.original, inquiry.addressed) {
            let inquiry_id = self.escalate(inquiry, embedding.as_ref()).await;
            return PipelineOutcome::Escalated { inquiry_id };
        }

        debug!("step: no stage matched and no escalation trigger, dropping");
        PipelineOutcome::Dropped { embedding }
    }

    async fn exact_stage(&self, inquiry: &Inquiry) -> Option<Resolution> {
        info!("step: exact stage");
        match self.keywords.find_match(&inquiry.text).await {
            Ok(Some(rule)) => {
                info!(rule_id = rule.id, "step: exact stage hit");
                Some(Resolution::Exact {
                    rule_id: rule.id,
                    response: rule.response,
                })
            }
            Ok(None) => None,
            Err(e) => {
                error!(error = %ResolveError::from(e), "Keyword lookup failed");
                None
            }
        }
    }

    /// Best-effort embedding; failures are logged and yield `None`.
    pub async fn embed(&self, inquiry: &Inquiry) -> Option<Embedding> {
        match self.embeddings.embed(&inquiry.text, inquiry.language).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(error = %ResolveError::from(e), "Embedding failed, similarity stage skipped");
                None
            }
        }
    }

    async fn similarity_stage(&self, inquiry: &Inquiry, query: &Embedding) -> Option<Resolution> {
        info!("step: similarity stage");
        let candidates = match self.messages.list_answered(&self.tracker.pending_ids()).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %ResolveError::from(e), "Loading similarity candidates failed");
                return None;
            }
        };
        if candidates.is_empty() {
            debug!("No answered messages to compare against");
            return None;
        }

        let mut best_score = inquiry.language.similarity_threshold();
        let mut best = None;
        for candidate in candidates {
            let Some(stored) = candidate.embedding.as_ref() else {
                continue;
            };
            if stored.dimension() != query.dimension() {
                debug!(
                    record_id = candidate.id,
                    stored = stored.dimension(),
                    query = query.dimension(),
                    "Skipping candidate with mismatched dimension"
                );
                continue;
            }
            let score = match self.embeddings.similarity(query, stored).await {
                Ok(score) => score,
                Err(e) => {
                    warn!(record_id = candidate.id, error = %ResolveError::from(e), "Similarity failed");
                    continue;
                }
            };
            debug!(record_id = candidate.id, score, "Candidate scored");
            if score > best_score {
                best_score = score;
                best = Some((candidate.id, candidate.response));
            }
        }

        let (record_id, response) = best?;
        info!(record_id, score = best_score, "step: similarity stage hit");
        Some(Resolution::Similar {
            record_id,
            score: best_score,
            response: response.unwrap_or_default(),
        })
    }

    /// Logs the inquiry unanswered, tracks it and forwards it to the escalation room.
    async fn escalate(&self, inquiry: &Inquiry, embedding: Option<&Embedding>) -> Option<i64> {
        info!("step: escalation");
        let inquiry_id = self.log_pending(inquiry, embedding).await;

        self.forward(inquiry).await;

        if self.escalation.acknowledge {
            let ack = escalation_ack(inquiry.language, &inquiry.sender);
            if let Err(e) = self.bot.send_message(&inquiry.chat, &ack).await {
                error!(error = %e, "Failed to acknowledge escalation");
            }
        }

        inquiry_id
    }

    async fn forward(&self, inquiry: &Inquiry) {
        let forward = format!("{}: {}", inquiry.sender, inquiry.original);
        match self.escalation.room.as_deref() {
            Some(room) => match self.bot.send_to_room(room, &forward).await {
                Ok(true) => info!(room = %room, "Forwarded inquiry"),
                Ok(false) => warn!(room = %room, "Escalation room not found"),
                Err(e) => error!(room = %room, error = %e, "Failed to forward inquiry"),
            },
            None => warn!("No escalation room configured, inquiry not forwarded"),
        }
    }

    async fn log_pending(&self, inquiry: &Inquiry, embedding: Option<&Embedding>) -> Option<i64> {
        let new = NewInquiry::new(&inquiry.text, &inquiry.sender, inquiry.room_topic())
            .with_embedding(embedding);
        match self.messages.log_inquiry(new).await {
            Ok(id) => {
                self.tracker.track(PendingInquiry {
                    id,
                    text: inquiry.text.clone(),
                    language: inquiry.language,
                    chat: inquiry.chat.clone(),
                });
                Some(id)
            }
            Err(e) => {
                error!(error = %ResolveError::from(e), "Failed to log inquiry");
                None
            }
        }
    }

    /// Logging-room record keeping: answered inquiries are logged with their answer; dropped ones
    /// are logged unanswered, become pending and are forwarded. Escalated inquiries are already
    /// logged.
    pub async fn keep_record(&self, inquiry: &Inquiry, outcome: &PipelineOutcome) -> Option<i64> {
        match outcome {
            PipelineOutcome::Answered {
                resolution,
                embedding,
            } => {
                let computed;
                let embedding = match embedding {
                    Some(e) => Some(e),
                    None => {
                        computed = self.embed(inquiry).await;
                        computed.as_ref()
                    }
                };
                let new = NewInquiry::new(&inquiry.text, &inquiry.sender, inquiry.room_topic())
                    .with_embedding(embedding)
                    .with_response(resolution.response());
                match self.messages.log_inquiry(new).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        error!(error = %ResolveError::from(e), "Failed to log answered inquiry");
                        None
                    }
                }
            }
            PipelineOutcome::Dropped { embedding } => {
                let inquiry_id = self.log_pending(inquiry, embedding.as_ref()).await;
                self.forward(inquiry).await;
                inquiry_id
            }
            PipelineOutcome::Escalated { .. } => None,
        }
    }
}
