//! Telegram Bot API adapter.
//!
//! [`TelegramChannel`] implements the `ChatChannel` port and exposes the
//! handful of Bot API methods both transports need (long polling and
//! webhook registration).

pub mod client;
pub mod types;

pub use client::TelegramChannel;
pub use types::TelegramUpdate;
