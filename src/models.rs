//! Core data models for the intent chatbot

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lexicographically sortable timestamp layout used in history and logs
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returned when the predicted tag has no catalog entry
pub const FALLBACK_RESPONSE: &str = "I'm sorry, I didn't understand that.";

/// Responses that end the session (compared case-insensitively)
pub const FAREWELL_RESPONSES: &[&str] = &["goodbye", "bye"];

//
// ================= Intents =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentDefinition {
    pub tag: String,
    pub responses: Vec<String>,
    /// Training utterances; carried by dataset exports, unused at runtime
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl IntentDefinition {
    pub fn new(tag: impl Into<String>, responses: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            responses,
            patterns: Vec::new(),
        }
    }
}

//
// ================= Interaction =================
//

/// One completed chatbot call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    pub user_input: String,
    pub response: String,
    pub timestamp: String,
}

impl Interaction {
    /// Stamp an interaction with the current local time
    pub fn new(user_input: impl Into<String>, response: impl Into<String>) -> Self {
        Self::at(user_input, response, Local::now())
    }

    pub fn at<Tz>(
        user_input: impl Into<String>,
        response: impl Into<String>,
        when: DateTime<Tz>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            user_input: user_input.into(),
            response: response.into(),
            timestamp: when.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

//
// ================= Orchestration =================
//

/// Phases of a single chatbot call, from input received to done or failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Normalizing,
    Classifying,
    Selecting,
    Logging,
    Done,
    Failed,
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallPhase::Normalizing => "normalizing",
            CallPhase::Classifying => "classifying",
            CallPhase::Selecting => "selecting",
            CallPhase::Logging => "logging",
            CallPhase::Done => "done",
            CallPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Result of a completed conversational turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub interaction: Interaction,
    /// The response was a farewell; the caller should stop asking for input
    pub end_of_session: bool,
    /// Set when the durable log append failed; the response is still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_error: Option<String>,
}

impl ChatOutcome {
    pub fn response(&self) -> &str {
        &self.interaction.response
    }

    pub fn logged(&self) -> bool {
        self.log_error.is_none()
    }
}

/// Farewell detection is a literal match on the response text, not the tag
pub fn is_farewell(response: &str) -> bool {
    let lowered = response.to_lowercase();
    FAREWELL_RESPONSES.iter().any(|f| lowered == *f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_timestamp_format() {
        let when = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let interaction = Interaction::at("hi", "Hello!", when);
        assert_eq!(interaction.timestamp, "2024-03-07 09:05:01");
    }

    #[test]
    fn test_farewell_detection() {
        assert!(is_farewell("Goodbye"));
        assert!(is_farewell("BYE"));
        assert!(!is_farewell("Goodbye! Have a nice day."));
        assert!(!is_farewell("bye bye"));
    }

    #[test]
    fn test_call_phase_labels() {
        assert_eq!(CallPhase::Classifying.to_string(), "classifying");
        assert_eq!(CallPhase::Failed.to_string(), "failed");
    }

    #[test]
    fn test_intent_patterns_optional() {
        let intent: IntentDefinition =
            serde_json::from_str(r#"{"tag":"greeting","responses":["Hi"]}"#).unwrap();
        assert!(intent.patterns.is_empty());
        assert_eq!(intent.responses, vec!["Hi".to_string()]);
    }
}
