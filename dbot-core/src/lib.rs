//! # dbot-core
//!
//! Core types and traits for the support bot: [`Bot`], [`Handler`], message, user and chat types,
//! and tracing initialization. Transport-agnostic; used by dbot-telegram, handler-chain and handlers.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::Bot;
pub use error::{DbotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    Chat, Handler, HandlerResponse, Message, ToCoreMessage, ToCoreUser, User, NO_ROOM_TOPIC,
};
