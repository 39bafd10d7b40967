//! REPL runner: converts teloxide messages to core::Message and passes them to HandlerChain.
//! Calls get_me first to learn the bot's username and id.

use crate::adapters::TelegramMessageWrapper;
use crate::room_directory::RoomDirectory;
use dbot_core::{Message, ToCoreMessage};
use anyhow::Result;
use handler_chain::HandlerChain;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

/// Converts a teloxide message, marks it `from_self` when sent by the bot, and learns its room.
pub fn to_core_message(
    msg: &teloxide::types::Message,
    bot_user_id: Option<i64>,
    rooms: &RoomDirectory,
) -> Message {
    let mut core_msg = TelegramMessageWrapper(msg).to_core();
    core_msg.from_self = bot_user_id.is_some_and(|id| id == core_msg.user.id);
    if let Some(title) = core_msg.chat.title.as_deref() {
        rooms.register(title, core_msg.chat.id);
    }
    core_msg
}

/// Starts the REPL with the given teloxide Bot and HandlerChain.
///
/// Writes the bot's username into `bot_username` before starting; each text message is converted
/// and handled in its own task.
#[instrument(skip(bot, handler_chain, bot_username, rooms))]
pub async fn run_repl(
    bot: teloxide::Bot,
    handler_chain: HandlerChain,
    bot_username: Arc<RwLock<Option<String>>>,
    rooms: Arc<RoomDirectory>,
) -> Result<()> {
    let bot_user_id = match bot.get_me().await {
        Ok(me) => {
            if let Some(username) = &me.user.username {
                let mut slot = bot_username.write().await;
                if slot.is_none() {
                    *slot = Some(username.clone());
                }
                info!(username = %username, "Bot username set before repl");
            }
            Some(me.user.id.0 as i64)
        }
        Err(e) => {
            warn!(error = %e, "get_me failed; own messages cannot be recognised");
            None
        }
    };

    let chain = handler_chain;
    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let chain = chain.clone();
        let rooms = rooms.clone();

        async move {
            if msg.text().is_none() {
                return respond(());
            }
            let core_msg = to_core_message(&msg, bot_user_id, &rooms);
            info!(
                user_id = core_msg.user.id,
                chat_id = core_msg.chat.id,
                room = %core_msg.chat.topic(),
                message_content = %core_msg.content,
                "Received message"
            );

            tokio::spawn(async move {
                info!(
                    user_id = core_msg.user.id,
                    chat_id = core_msg.chat.id,
                    message_id = %core_msg.id,
                    "step: processing message (handler chain started)"
                );
                if let Err(e) = chain.handle(&core_msg).await {
                    error!(error = %e, user_id = core_msg.user.id, "Handler chain failed");
                }
            });

            respond(())
        }
    })
    .await;

    Ok(())
}
