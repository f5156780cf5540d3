//! Session memory
//!
//! Conversation history scoped to a single user session. Nothing here is
//! persisted; the durable record lives in the interaction log.

pub mod store;

pub use store::{SessionHistory, EMPTY_HISTORY_MESSAGE};
