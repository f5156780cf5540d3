//! Environment configuration
//!
//! Artifact and log locations plus the API port, read from the process
//! environment after loading an optional `.env` file.

use crate::error::ChatbotError;
use crate::Result;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_INTENTS_PATH: &str = "Dataset.json";
pub const DEFAULT_VECTORIZER_PATH: &str = "vectorizer.json";
pub const DEFAULT_MODEL_PATH: &str = "chatbot_model.json";
pub const DEFAULT_LOG_PATH: &str = "chat_log.csv";
pub const DEFAULT_API_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatbotConfig {
    pub intents_path: PathBuf,
    pub vectorizer_path: PathBuf,
    pub model_path: PathBuf,
    pub log_path: PathBuf,
    pub api_port: u16,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            intents_path: DEFAULT_INTENTS_PATH.into(),
            vectorizer_path: DEFAULT_VECTORIZER_PATH.into(),
            model_path: DEFAULT_MODEL_PATH.into(),
            log_path: DEFAULT_LOG_PATH.into(),
            api_port: DEFAULT_API_PORT,
        }
    }
}

impl ChatbotConfig {
    /// Load `.env` (if present) and read the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        let api_port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ChatbotError::ConfigError(format!("Invalid port '{}'", raw))
            })?,
            None => defaults.api_port,
        };

        Ok(Self {
            intents_path: path("CHATBOT_INTENTS_PATH", defaults.intents_path),
            vectorizer_path: path("CHATBOT_VECTORIZER_PATH", defaults.vectorizer_path),
            model_path: path("CHATBOT_MODEL_PATH", defaults.model_path),
            log_path: path("CHATBOT_LOG_PATH", defaults.log_path),
            api_port,
        })
    }
}
