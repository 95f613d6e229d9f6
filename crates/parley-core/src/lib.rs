//! Business logic and port traits for Parley.
//!
//! This crate owns the stateful core of the proxy (conversation history,
//! context assembly, turn orchestration) and defines the "ports"
//! (`LlmProvider`, `ChatChannel`) that the infrastructure layer implements.
//! It depends only on `parley-types` -- never on `parley-infra` or any
//! HTTP crate.

pub mod channel;
pub mod conversation;
pub mod llm;
