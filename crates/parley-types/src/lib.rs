//! Shared domain types for Parley.
//!
//! This crate contains the types passed between the Parley crates:
//! conversation turns, LLM request/response shapes, chat channel messages,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod channel;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
