//! Bot runner: validate config, init tracing, build components and the handler chain, run the REPL.
//! Also hosts the read-only inspection commands.

use crate::cli::{format_messages, format_rules};
use crate::components::{
    build_components, build_handler_chain, build_support_handler, open_repositories,
};
use crate::config::BotConfig;
use anyhow::{Context, Result};
use dbot_core::{init_tracing, Bot};
use dbot_telegram::{run_repl, TelegramBotAdapter};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Main entry: validate, init logging, build components and chain, then run the REPL.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;
    if let Some(dir) = Path::new(&config.log_file).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    init_tracing(&config.log_file)?;

    info!(
        database_url = %config.database_url,
        embedding_url = %config.embedding.service_url,
        admin = ?config.admin_name,
        logging_room = ?config.logging_room_topic,
        response_room = ?config.response_room_topic,
        escalation_room = ?config.escalation_room_topic,
        "Initializing bot"
    );

    let components = build_components(&config, None).await?;
    let teloxide_bot = config.telegram.build_bot();
    let bot: Arc<dyn Bot> = Arc::new(TelegramBotAdapter::new(
        teloxide_bot.clone(),
        components.rooms.clone(),
    ));
    let handler = build_support_handler(&config, &components, bot);
    let chain = build_handler_chain(handler);

    info!(known_rooms = components.rooms.len(), "Bot started successfully");
    run_repl(
        teloxide_bot,
        chain,
        components.bot_username.clone(),
        components.rooms.clone(),
    )
    .await
}

pub async fn list_keywords(database_url: &str) -> Result<()> {
    let (keywords, _) = open_repositories(database_url).await?;
    let rules = keywords.list_rules().await.context("Query keyword rules")?;
    println!("{}", format_rules(&rules));
    Ok(())
}

pub async fn list_messages(database_url: &str, limit: u32, answered_only: bool) -> Result<()> {
    let (_, messages) = open_repositories(database_url).await?;
    let records = messages
        .list_recent(limit, answered_only)
        .await
        .context("Query recent messages")?;
    println!("{}", format_messages(&records));
    Ok(())
}
