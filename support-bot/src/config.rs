//! Bot configuration loaded from environment variables.
//!
//! Composes the Telegram connectivity config and the embedding gateway config with the routing
//! settings of the support bot (admin identity, rooms, correlation mode).

use anyhow::{bail, Context, Result};
use dbot_telegram::TelegramConfig;
use embedding::EnvEmbeddingConfig;
use std::env;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "./support_bot.db";
pub const DEFAULT_LOG_FILE: &str = "logs/support-bot.log";

/// How administrator replies are matched to pending inquiries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelationMode {
    /// FIFO queue per room; replies may cite `#id`.
    #[default]
    Queue,
    /// One process-wide slot; a newer inquiry orphans the previous one.
    Single,
}

impl FromStr for CorrelationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(CorrelationMode::Queue),
            "single" => Ok(CorrelationMode::Single),
            other => bail!("CORRELATION_MODE must be 'queue' or 'single', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    /// LOG_FILE
    pub log_file: String,
    /// DATABASE_URL (SQLite file path)
    pub database_url: String,
    /// ADMIN_NAME, falling back to USER_NAME
    pub admin_name: Option<String>,
    /// BOT_HANDLE; discovered with get_me when unset
    pub bot_handle: Option<String>,
    /// ROOM_TOPIC or LOGGING_ROOM_TOPIC
    pub logging_room_topic: Option<String>,
    /// RESPONSE_ROOM_TOPIC
    pub response_room_topic: Option<String>,
    /// ESCALATION_ROOM_TOPIC, defaulting to the response room
    pub escalation_room_topic: Option<String>,
    /// CORRELATION_MODE
    pub correlation_mode: CorrelationMode,
    /// ESCALATION_ACK
    pub escalation_ack: bool,
    /// RELAY_ANNOTATE
    pub relay_annotate: bool,
    pub embedding: EnvEmbeddingConfig,
}

impl BotConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let telegram = TelegramConfig::load(token)?;
        let response_room_topic = non_empty_var("RESPONSE_ROOM_TOPIC");
        let escalation_room_topic =
            non_empty_var("ESCALATION_ROOM_TOPIC").or_else(|| response_room_topic.clone());
        let correlation_mode = match non_empty_var("CORRELATION_MODE") {
            Some(raw) => raw.parse()?,
            None => CorrelationMode::default(),
        };

        Ok(Self {
            telegram,
            log_file: non_empty_var("LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            database_url: database_url_from_env(),
            admin_name: non_empty_var("ADMIN_NAME").or_else(|| non_empty_var("USER_NAME")),
            bot_handle: non_empty_var("BOT_HANDLE")
                .map(|h| h.trim_start_matches('@').to_string()),
            logging_room_topic: non_empty_var("ROOM_TOPIC")
                .or_else(|| non_empty_var("LOGGING_ROOM_TOPIC")),
            response_room_topic,
            escalation_room_topic,
            correlation_mode,
            escalation_ack: env_flag("ESCALATION_ACK", true)?,
            relay_annotate: env_flag("RELAY_ANNOTATE", true)?,
            embedding: EnvEmbeddingConfig::from_env()?,
        })
    }

    /// Validate config (Telegram URL, embedding service URL, routing completeness).
    pub fn validate(&self) -> Result<()> {
        self.telegram.validate()?;
        self.embedding.validate()?;
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL is empty");
        }
        if self.response_room_topic.is_some() && self.admin_name.is_none() {
            bail!("RESPONSE_ROOM_TOPIC is set but neither ADMIN_NAME nor USER_NAME is");
        }
        Ok(())
    }
}

/// DATABASE_URL or the default SQLite file. Used without a bot token by the inspection commands.
pub fn database_url_from_env() -> String {
    non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Boolean env var: true/false, 1/0, yes/no, on/off. Unset means `default`.
fn env_flag(key: &str, default: bool) -> Result<bool> {
    let Some(raw) = non_empty_var(key) else {
        return Ok(default);
    };
    parse_flag(&raw).with_context(|| format!("{} must be a boolean, got '{}'", key, raw))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => bail!("not a boolean"),
    }
}
