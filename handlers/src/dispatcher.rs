//! Command dispatcher: classifies each inbound message and routes it.
//!
//! Routing table, first match wins:
//!
//! | Text | Sender | Route |
//! |---|---|---|
//! | respond word | bot itself, or admin in the response room | [`Route::Respond`] |
//! | respond word | anyone else | [`Route::Ignore`] |
//! | management word | bot itself or admin | [`Route::Manage`] / [`Route::Malformed`] |
//! | anything | bot itself | [`Route::Ignore`] |
//! | anything | others | [`Route::Inquiry`] |

use crate::command::{Command, CommandSyntax};
use crate::error::ResolveError;
use crate::pipeline::{Inquiry, PipelineOutcome, ResolutionPipeline};
use crate::respond::Responder;
use async_trait::async_trait;
use dbot_core::{Bot, Handler, HandlerResponse, Message, Result, User};
use std::sync::Arc;
use storage::{KeywordRepository, RemoveOutcome};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Identities and rooms the dispatcher routes by.
#[derive(Debug, Clone, Default)]
pub struct SupportSettings {
    /// Administrator identity (username or display name).
    pub admin: Option<String>,
    /// Topic of the room administrators reply from.
    pub response_room: Option<String>,
    /// Topic of the room whose inquiries are always logged.
    pub logging_room: Option<String>,
    pub syntax: CommandSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Keyword store mutation.
    Manage(Command),
    /// Management or respond command with bad arguments.
    Malformed(ResolveError),
    /// Administrator reply. `relay` is false for a bot-issued reply outside the response room.
    Respond {
        target: Option<i64>,
        text: String,
        relay: bool,
    },
    Inquiry,
    Ignore(&'static str),
}

/// The support bot's handler: rule management, administrator replies and inquiry resolution.
#[derive(Clone)]
pub struct SupportHandler {
    pipeline: ResolutionPipeline,
    responder: Responder,
    keywords: KeywordRepository,
    bot: Arc<dyn Bot>,
    bot_handle: Arc<RwLock<Option<String>>>,
    settings: SupportSettings,
}

impl SupportHandler {
    pub fn new(
        pipeline: ResolutionPipeline,
        responder: Responder,
        keywords: KeywordRepository,
        bot: Arc<dyn Bot>,
        bot_handle: Arc<RwLock<Option<String>>>,
        settings: SupportSettings,
    ) -> Self {
        Self {
            pipeline,
            responder,
            keywords,
            bot,
            bot_handle,
            settings,
        }
    }

    fn is_admin(&self, user: &User) -> bool {
        self.settings
            .admin
            .as_deref()
            .is_some_and(|admin| user.is_identified_by(admin))
    }

    fn in_response_room(&self, message: &Message) -> bool {
        self.settings
            .response_room
            .as_deref()
            .is_some_and(|room| room == message.chat.topic())
    }

    /// Classifies a message without side effects.
    pub fn classify(&self, message: &Message) -> Route {
        let text = message.content.trim();
        if text.is_empty() {
            return Route::Ignore("empty message");
        }
        let syntax = &self.settings.syntax;
        let is_admin = self.is_admin(&message.user);
        let in_response_room = self.in_response_room(message);

        if syntax.is_respond(text) {
            if !(message.from_self || (is_admin && in_response_room)) {
                return Route::Ignore("respond command not from the admin in the response room");
            }
            return match syntax.parse(text) {
                Ok(Command::Respond { target, text }) => Route::Respond {
                    target,
                    text,
                    relay: in_response_room,
                },
                Ok(_) => Route::Ignore("not a respond command"),
                Err(e) => Route::Malformed(e),
            };
        }

        if syntax.is_management(text) && (message.from_self || is_admin) {
            return match syntax.parse(text) {
                Ok(command) => Route::Manage(command),
                Err(e) => Route::Malformed(e),
            };
        }

        if message.from_self {
            return Route::Ignore("own message");
        }
        Route::Inquiry
    }

    async fn apply(&self, command: Command) -> std::result::Result<(), ResolveError> {
        match command {
            Command::AddRule { group, response } => {
                let id = self.keywords.add_rule(&group, &response).await?;
                info!(rule_id = id, "Keyword rule added");
            }
            Command::EditKeyword { id, term } => {
                self.keywords.append_term(id, &term).await?;
            }
            Command::EditResponse { id, response } => {
                self.keywords.set_response(id, &response).await?;
            }
            Command::RemoveRule { id, term: Some(term) } => {
                if self.keywords.remove_term(id, &term).await? == RemoveOutcome::RuleDeleted {
                    info!(rule_id = id, "Last keyword removed, rule deleted");
                }
            }
            Command::RemoveRule { id, term: None } => {
                self.keywords.delete_rule(id).await?;
            }
            Command::Respond { .. } | Command::PlainInquiry => {}
        }
        Ok(())
    }

    async fn handle_inquiry(&self, message: &Message) -> Result<HandlerResponse> {
        let handle = self.bot_handle.read().await.clone();
        let inquiry = Inquiry::from_message(message, handle.as_deref());

        let outcome = self.pipeline.resolve(&inquiry).await;

        let response = match &outcome {
            PipelineOutcome::Answered { resolution, .. } => {
                let text = resolution.response().to_string();
                if let Err(e) = self.bot.reply_to(message, &text).await {
                    error!(error = %e, message_id = %message.id, "Failed to send reply");
                }
                HandlerResponse::Reply(text)
            }
            PipelineOutcome::Escalated { .. } | PipelineOutcome::Dropped { .. } => {
                HandlerResponse::Stop
            }
        };

        let is_logging_room = self
            .settings
            .logging_room
            .as_deref()
            .is_some_and(|room| room == inquiry.room_topic());
        if is_logging_room {
            if let Some(id) = self.pipeline.keep_record(&inquiry, &outcome).await {
                debug!(inquiry_id = id, "Logging room record kept");
            }
        }

        Ok(response)
    }
}

#[async_trait]
impl Handler for SupportHandler {
    #[instrument(skip(self, message))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        info!(
            user_id = message.user.id,
            chat_id = message.chat.id,
            message_id = %message.id,
            from_self = message.from_self,
            "step: SupportHandler handle"
        );

        match self.classify(message) {
            Route::Manage(command) => {
                if let Err(e) = self.apply(command).await {
                    warn!(error = %e, "Rule management command failed");
                }
                Ok(HandlerResponse::Stop)
            }
            Route::Malformed(e) => {
                warn!(error = %e, "Rejected malformed command");
                Ok(HandlerResponse::Stop)
            }
            Route::Respond {
                target,
                text,
                relay,
            } => {
                match self.responder.respond(target, &text, relay).await {
                    Ok(done) => info!(
                        inquiry_id = done.inquiry_id,
                        relayed = done.relayed,
                        "Administrator reply correlated"
                    ),
                    Err(e) => warn!(error = %e, "Respond command had no effect"),
                }
                Ok(HandlerResponse::Stop)
            }
            Route::Inquiry => self.handle_inquiry(message).await,
            Route::Ignore(reason) => {
                debug!(reason, "Message ignored");
                Ok(HandlerResponse::Ignore)
            }
        }
    }
}
