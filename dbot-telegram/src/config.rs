//! Telegram connectivity config: token, optional API URL, pre-registered rooms.
//! Loaded from env: BOT_TOKEN, TELEGRAM_API_URL (or TELOXIDE_API_URL), ROOM_IDS.

use crate::room_directory::parse_room_ids;
use anyhow::{Context, Result};
use std::env;
use tracing::error;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub telegram_api_url: Option<String>,
    /// `(topic, chat_id)` pairs registered before the first message arrives.
    pub room_ids: Vec<(String, i64)>,
}

impl TelegramConfig {
    /// Loads from env. `token` overrides BOT_TOKEN if provided; one of them is required.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        let room_ids = parse_room_ids(&env::var("ROOM_IDS").unwrap_or_default())?;
        Ok(Self {
            bot_token,
            telegram_api_url,
            room_ids,
        })
    }

    /// Builds config with the given token; other fields empty.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
            room_ids: Vec::new(),
        }
    }

    /// Rejects an empty token and a malformed API URL.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN is empty");
        }
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        Ok(())
    }

    /// teloxide Bot pointed at the configured API URL.
    pub fn build_bot(&self) -> teloxide::Bot {
        let bot = teloxide::Bot::new(self.bot_token.clone());
        match self.telegram_api_url.as_deref().map(reqwest::Url::parse) {
            Some(Ok(url)) => bot.set_api_url(url),
            Some(Err(e)) => {
                error!(error = %e, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
            None => bot,
        }
    }
}
