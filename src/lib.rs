//! ChatEase Intent Chatbot
//!
//! Classifies a free-text utterance into one of a fixed set of intents and
//! answers with one of that intent's canned responses:
//! - Deterministic normalization and TF-IDF feature extraction
//! - A pre-trained linear classifier mapping features to an intent tag
//! - Uniform random response selection with a fixed fallback
//! - Append-only CSV interaction log with a one-time header
//! - In-memory, session-scoped conversation history
//!
//! TURN:
//! INPUT → NORMALIZE → CLASSIFY → SELECT → LOG → DONE

pub mod api;
pub mod audit;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod conversational;
pub mod error;
pub mod memory;
pub mod models;
pub mod selector;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use catalog::IntentCatalog;
pub use classifier::ClassifierPipeline;
pub use conversational::Chatbot;
