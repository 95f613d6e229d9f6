//! Infrastructure adapters for Parley.
//!
//! Implements the ports defined in `parley-core` against real services:
//! the Gemini and OpenAI-compatible model APIs, the Telegram Bot API, the
//! process environment (secrets and transport settings), and the optional
//! TOML config file.

pub mod config;
pub mod llm;
pub mod secret;
pub mod telegram;
