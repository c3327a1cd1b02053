//! igr-telegram: Telegram control surface for the auto-reply relay
//!
//! Receives operator commands through a webhook and applies them to the
//! thread registry the Instagram poller reads.

pub mod bot;
pub mod commands;
pub mod error;
pub mod webhook;

pub use bot::TelegramBot;
pub use commands::{Command, CommandHandler};
pub use error::{Result, TelegramError};
pub use webhook::{ReplySender, WebhookState, create_webhook_router};
