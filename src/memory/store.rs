//! Session-scoped conversation history
//!
//! Held in memory only; dropped or cleared when the session ends.

use crate::audit::LOG_HEADER;
use crate::models::Interaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EMPTY_HISTORY_MESSAGE: &str = "No conversation history available.";

/// Ordered interactions for one user session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    interactions: Vec<Interaction>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(session_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            created_at: now,
            updated_at: now,
            interactions: Vec::new(),
        }
    }

    /// Append in call-completion order
    pub fn append(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
        self.updated_at = Utc::now();
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn clear(&mut self) {
        self.interactions.clear();
        self.updated_at = Utc::now();
    }

    /// Plain-text table of the conversation for terminal display
    pub fn render_table(&self) -> String {
        if self.interactions.is_empty() {
            return EMPTY_HISTORY_MESSAGE.to_string();
        }

        let mut widths = LOG_HEADER.map(|h| h.chars().count());
        for i in &self.interactions {
            let cells = [&i.user_input, &i.response, &i.timestamp];
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_row(&mut out, &widths, LOG_HEADER);
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');

        for i in &self.interactions {
            push_row(
                &mut out,
                &widths,
                [i.user_input.as_str(), i.response.as_str(), i.timestamp.as_str()],
            );
        }

        out
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn push_row(out: &mut String, widths: &[usize; 3], cells: [&str; 3]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(i: usize) -> Interaction {
        Interaction {
            user_input: format!("Question {}", i),
            response: format!("Answer {}", i),
            timestamp: format!("2024-05-01 12:00:{:02}", i),
        }
    }

    #[test]
    fn test_history_preserves_order() {
        let mut history = SessionHistory::new();
        for i in 0..10 {
            history.append(interaction(i));
        }

        assert_eq!(history.len(), 10);
        let expected: Vec<_> = (0..10).map(interaction).collect();
        assert_eq!(history.interactions(), expected.as_slice());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut history = SessionHistory::new();
        history.append(interaction(1));
        history.append(interaction(1));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut history = SessionHistory::new();
        history.append(interaction(0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.render_table(), EMPTY_HISTORY_MESSAGE);
    }

    #[test]
    fn test_render_table() {
        let mut history = SessionHistory::new();
        history.append(interaction(1));
        history.append(Interaction {
            user_input: "hi".into(),
            response: "Hello!".into(),
            timestamp: "2024-05-01 12:00:09".into(),
        });

        let table = history.render_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("User Input | Chatbot Response | Timestamp"));
        assert!(lines[2].starts_with("Question 1 | Answer 1"));
        assert!(lines[3].starts_with("hi         | Hello!"));
    }
}
