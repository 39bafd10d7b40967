//! CLI: run the bot or inspect the keyword rules and the inquiry log.

use clap::{Parser, Subcommand};
use storage::{KeywordRule, MessageRecord};

const TEXT_PREVIEW_LEN: usize = 60;

#[derive(Parser)]
#[command(name = "support-bot")]
#[command(about = "Support chat bot: run, keywords, messages", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
    /// List keyword rules (DATABASE_URL from env).
    Keywords,
    /// List recent inquiries, newest first.
    Messages {
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Only inquiries that have a recorded response.
        #[arg(long)]
        answered: bool,
    },
}

pub fn format_rules(rules: &[KeywordRule]) -> String {
    if rules.is_empty() {
        return "No keyword rules.".to_string();
    }
    let mut out = format!("{:<6} {:<32} {}\n", "id", "terms", "response");
    out.push_str(&"-".repeat(80));
    for rule in rules {
        out.push('\n');
        out.push_str(&format!(
            "{:<6} {:<32} {}",
            rule.id,
            rule.group.to_column(),
            preview(&rule.response)
        ));
    }
    out
}

/// One line per record; pending inquiries show `-` as response so their ids can be cited.
pub fn format_messages(records: &[MessageRecord]) -> String {
    if records.is_empty() {
        return "No messages.".to_string();
    }
    let mut out = format!(
        "{:<6} {:<20} {:<16} {:<16} {:<62} {}\n",
        "id", "created", "room", "sender", "text", "response"
    );
    out.push_str(&"-".repeat(140));
    for r in records {
        let response = r.response.as_deref().filter(|s| !s.is_empty()).map(preview);
        out.push('\n');
        out.push_str(&format!(
            "{:<6} {:<20} {:<16} {:<16} {:<62} {}",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.room_topic,
            r.sender,
            preview(&r.text),
            response.as_deref().unwrap_or("-")
        ));
    }
    out
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= TEXT_PREVIEW_LEN {
        return flat;
    }
    let cut: String = flat.chars().take(TEXT_PREVIEW_LEN - 3).collect();
    format!("{cut}...")
}
