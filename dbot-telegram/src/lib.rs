//! # dbot-telegram
//!
//! Telegram transport for the support bot: adapters, [`dbot_core::Bot`] implementation, room
//! directory, config, REPL runner. No persistence or resolution logic.

mod adapters;
mod bot_adapter;
mod config;
mod room_directory;
mod runner;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::TelegramBotAdapter;
pub use config::TelegramConfig;
pub use room_directory::{parse_room_ids, RoomDirectory};
pub use runner::{run_repl, to_core_message};
