//! Telegram Bot API integration.
//!
//! Long polling with `getUpdates`, replies with `sendMessage`, and
//! acknowledgement of button presses with `answerCallbackQuery`.
//!
//! # Modules
//!
//! - `client` - HTTP client for the Bot API
//! - `types` - Wire types for updates and keyboards
//! - `error` - Telegram-specific errors

mod client;
mod error;
pub mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
