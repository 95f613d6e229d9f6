//! Conversation memory and the request/response round.
//!
//! - `store`: per-conversation rolling turn history
//! - `context`: assembles the model context from preamble + history + message
//! - `orchestrator`: runs one round and commits history only on success

pub mod context;
pub mod orchestrator;
pub mod store;
