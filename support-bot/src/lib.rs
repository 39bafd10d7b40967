//! # Support bot application
//!
//! Wires storage, the embedding gateway, the support handlers and the Telegram transport.
//! Config comes from env; `run_bot` starts the REPL.

pub mod cli;
pub mod components;
pub mod config;
pub mod runner;

pub use cli::{Cli, Commands};
pub use components::{
    build_components, build_handler_chain, build_support_handler, build_tracker,
    open_repositories, SupportComponents,
};
pub use config::{BotConfig, CorrelationMode};
pub use runner::{list_keywords, list_messages, run_bot};
