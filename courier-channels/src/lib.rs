//! Platform delivery for courier
//!
//! This crate provides the per-platform senders (Telegram, Discord, OneBot)
//! and the [`Dispatcher`] that routes replies to the active connection.

pub mod base;
pub mod common;
pub mod discord;
pub mod dispatcher;
pub mod manager;
pub mod onebot;
pub mod telegram;

pub use base::{DispatchError, PlatformSender, Result, RichContent, SenderPtr};
pub use discord::DiscordSender;
pub use dispatcher::{Connection, Dispatcher};
pub use manager::SenderSet;
pub use onebot::OneBotSender;
pub use telegram::TelegramSender;
