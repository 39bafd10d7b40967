use anyhow::Result;
use clap::Parser;
use support_bot::config::database_url_from_env;
use support_bot::{list_keywords, list_messages, run_bot, BotConfig, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = BotConfig::load(token)?;
            run_bot(config).await
        }
        Commands::Keywords => list_keywords(&database_url_from_env()).await,
        Commands::Messages { limit, answered } => {
            list_messages(&database_url_from_env(), limit, answered).await
        }
    }
}
