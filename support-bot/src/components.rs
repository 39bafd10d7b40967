//! Component factory: builds repositories, embedding gateway, tracker and handler chain from
//! config. Isolates assembly logic from the runner.

use crate::config::{BotConfig, CorrelationMode};
use anyhow::{Context, Result};
use dbot_core::Bot;
use dbot_telegram::RoomDirectory;
use embedding::EmbeddingService;
use handler_chain::HandlerChain;
use handlers::{
    CommandSyntax, CorrelationTracker, EscalationSettings, LoggingHandler, ResolutionPipeline,
    Responder, RoomQueueTracker, SingleSlotTracker, SupportHandler, SupportSettings,
};
use http_embedding::HttpEmbedding;
use std::sync::Arc;
use storage::{KeywordRepository, MessageRepository, SqlitePoolManager};
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

/// Shared dependencies of the support handler.
#[derive(Clone)]
pub struct SupportComponents {
    pub keywords: KeywordRepository,
    pub messages: MessageRepository,
    pub embeddings: Arc<dyn EmbeddingService>,
    pub tracker: Arc<dyn CorrelationTracker>,
    pub rooms: Arc<RoomDirectory>,
    pub bot_username: Arc<RwLock<Option<String>>>,
}

/// Opens both repositories on one pool.
#[instrument]
pub async fn open_repositories(database_url: &str) -> Result<(KeywordRepository, MessageRepository)> {
    let pool = SqlitePoolManager::new(database_url).await.map_err(|e| {
        error!(error = %e, database_url = %database_url, "Failed to open database");
        anyhow::anyhow!("Failed to open database {}: {}", database_url, e)
    })?;
    let keywords = KeywordRepository::from_pool(pool.clone())
        .await
        .context("Failed to initialize keyword storage")?;
    let messages = MessageRepository::from_pool(pool)
        .await
        .context("Failed to initialize message storage")?;
    Ok((keywords, messages))
}

pub fn build_tracker(mode: CorrelationMode) -> Arc<dyn CorrelationTracker> {
    match mode {
        CorrelationMode::Queue => Arc::new(RoomQueueTracker::new()),
        CorrelationMode::Single => Arc::new(SingleSlotTracker::new()),
    }
}

/// Builds components from config. `embeddings` overrides the HTTP gateway (tests).
#[instrument(skip(config, embeddings))]
pub async fn build_components(
    config: &BotConfig,
    embeddings: Option<Arc<dyn EmbeddingService>>,
) -> Result<SupportComponents> {
    let (keywords, messages) = open_repositories(&config.database_url).await?;

    let embeddings = match embeddings {
        Some(service) => service,
        None => {
            let gateway = HttpEmbedding::from_config(&config.embedding)
                .context("Failed to build embedding client")?;
            info!(
                service_url = %gateway.base_url(),
                similarity_mode = ?config.embedding.similarity_mode,
                "Using HTTP embedding service"
            );
            Arc::new(gateway)
        }
    };

    info!(mode = ?config.correlation_mode, "Correlation tracker");
    Ok(SupportComponents {
        keywords,
        messages,
        embeddings,
        tracker: build_tracker(config.correlation_mode),
        rooms: Arc::new(RoomDirectory::with_rooms(config.telegram.room_ids.clone())),
        bot_username: Arc::new(RwLock::new(config.bot_handle.clone())),
    })
}

/// Wires the support handler against `bot`.
pub fn build_support_handler(
    config: &BotConfig,
    components: &SupportComponents,
    bot: Arc<dyn Bot>,
) -> SupportHandler {
    let pipeline = ResolutionPipeline::new(
        components.keywords.clone(),
        components.messages.clone(),
        components.embeddings.clone(),
        components.tracker.clone(),
        bot.clone(),
        EscalationSettings {
            room: config.escalation_room_topic.clone(),
            acknowledge: config.escalation_ack,
        },
    );
    let responder = Responder::new(
        components.messages.clone(),
        components.tracker.clone(),
        bot.clone(),
        config.relay_annotate,
    );
    SupportHandler::new(
        pipeline,
        responder,
        components.keywords.clone(),
        bot,
        components.bot_username.clone(),
        SupportSettings {
            admin: config.admin_name.clone(),
            response_room: config.response_room_topic.clone(),
            logging_room: config.logging_room_topic.clone(),
            syntax: CommandSyntax::default(),
        },
    )
}

pub fn build_handler_chain(handler: SupportHandler) -> HandlerChain {
    HandlerChain::new()
        .add_handler(Arc::new(LoggingHandler))
        .add_handler(Arc::new(handler))
}
