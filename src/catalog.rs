//! Intent catalog
//!
//! Loaded once at start-up from the intents dataset and shared read-only
//! for the life of the process.

use crate::error::ChatbotError;
use crate::models::IntentDefinition;
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Accepts both a bare array and the `{ "intents": [...] }` export shape
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Intents { intents: Vec<IntentDefinition> },
    List(Vec<IntentDefinition>),
}

/// Ordered intent definitions indexed by tag
#[derive(Debug, Clone)]
pub struct IntentCatalog {
    intents: Vec<IntentDefinition>,
    by_tag: HashMap<String, usize>,
}

impl IntentCatalog {
    /// Build a catalog, rejecting empty response lists and duplicate tags
    pub fn new(intents: Vec<IntentDefinition>) -> Result<Self> {
        let mut by_tag = HashMap::with_capacity(intents.len());

        for (index, intent) in intents.iter().enumerate() {
            if intent.responses.is_empty() {
                return Err(ChatbotError::LoadError(format!(
                    "Intent '{}' has no responses",
                    intent.tag
                )));
            }
            if by_tag.insert(intent.tag.clone(), index).is_some() {
                return Err(ChatbotError::LoadError(format!(
                    "Duplicate intent tag '{}'",
                    intent.tag
                )));
            }
        }

        Ok(Self { intents, by_tag })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)
            .map_err(|e| ChatbotError::LoadError(format!("Malformed intents document: {}", e)))?;

        let intents = match document {
            CatalogDocument::Intents { intents } => intents,
            CatalogDocument::List(intents) => intents,
        };

        Self::new(intents)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ChatbotError::LoadError(format!(
                "Failed to read intents from {}: {}",
                path.display(),
                e
            ))
        })?;

        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            intents = catalog.len(),
            "Intent catalog loaded"
        );
        Ok(catalog)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, tag: &str) -> Option<&IntentDefinition> {
        self.by_tag.get(tag).map(|&i| &self.intents[i])
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.intents.iter().map(|i| i.tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
