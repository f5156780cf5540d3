//! TF-IDF feature extractor loaded from an exported vectorizer

use super::{FeatureExtractor, FeatureVector};
use crate::error::ChatbotError;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

lazy_static! {
    static ref DEFAULT_TOKEN_REGEX: Regex =
        Regex::new(DEFAULT_TOKEN_PATTERN).expect("default token pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

#[derive(Debug, Deserialize)]
struct VectorizerArtifact {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    token_pattern: Option<String>,
    #[serde(default)]
    stop_words: Vec<String>,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

fn default_lowercase() -> bool {
    true
}

/// Word n-gram TF-IDF vectorizer with a fixed vocabulary
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    ngram_range: (usize, usize),
    token_regex: Regex,
    stop_words: HashSet<String>,
    norm: Option<Norm>,
    sublinear_tf: bool,
    lowercase: bool,
}

impl TfidfVectorizer {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: VectorizerArtifact = serde_json::from_slice(bytes)
            .map_err(|e| ChatbotError::LoadError(format!("Malformed vectorizer artifact: {}", e)))?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: VectorizerArtifact) -> Result<Self> {
        let dimension = artifact.idf.len();

        if artifact.vocabulary.len() != dimension {
            return Err(ChatbotError::LoadError(format!(
                "Vectorizer vocabulary has {} terms but idf has {} weights",
                artifact.vocabulary.len(),
                dimension
            )));
        }

        let mut seen = vec![false; dimension];
        for (term, &index) in &artifact.vocabulary {
            if index >= dimension || std::mem::replace(&mut seen[index], true) {
                return Err(ChatbotError::LoadError(format!(
                    "Vectorizer term '{}' has invalid or repeated index {}",
                    term, index
                )));
            }
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ChatbotError::LoadError(format!(
                "Invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }

        let token_regex = match artifact.token_pattern.as_deref() {
            None => DEFAULT_TOKEN_REGEX.clone(),
            Some(DEFAULT_TOKEN_PATTERN) => DEFAULT_TOKEN_REGEX.clone(),
            Some(pattern) => Regex::new(pattern).map_err(|e| {
                ChatbotError::LoadError(format!("Invalid token pattern '{}': {}", pattern, e))
            })?,
        };

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            ngram_range: artifact.ngram_range,
            token_regex,
            stop_words: artifact.stop_words.into_iter().collect(),
            norm: artifact.norm,
            sublinear_tf: artifact.sublinear_tf,
            lowercase: artifact.lowercase,
        })
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.token_regex
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .collect()
    }

    /// N-grams are joined with a single space, matching the vocabulary keys
    fn terms(&self, tokens: &[&str]) -> Vec<String> {
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();

        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }

        terms
    }
}

impl FeatureExtractor for TfidfVectorizer {
    fn dimension(&self) -> usize {
        self.idf.len()
    }

    fn transform(&self, text: &str) -> Result<FeatureVector> {
        let lowered;
        let text = if self.lowercase {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        let tokens = self.tokenize(text);

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in self.terms(&tokens) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        // Sort before weighting so the norm is summed in a fixed order
        let mut entries: Vec<(usize, f64)> = counts.into_iter().collect();
        entries.sort_by_key(|(index, _)| *index);

        for (index, value) in entries.iter_mut() {
            let tf = if self.sublinear_tf { 1.0 + value.ln() } else { *value };
            *value = tf * self.idf[*index];
        }

        let norm = match self.norm {
            Some(Norm::L2) => entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => entries.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            None => 0.0,
        };
        if norm > 0.0 {
            for (_, value) in entries.iter_mut() {
                *value /= norm;
            }
        }

        Ok(FeatureVector::new(self.dimension(), entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer(json: &str) -> TfidfVectorizer {
        TfidfVectorizer::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_default_tokenization_drops_single_chars() {
        let v = vectorizer(r#"{"vocabulary": {"hello": 0, "a": 1}, "idf": [1.0, 1.0]}"#);
        let features = v.transform("a hello").unwrap();
        assert_eq!(features.entries(), &[(0, 1.0)]);
    }

    #[test]
    fn test_l2_normalization_and_idf() {
        let v = vectorizer(r#"{"vocabulary": {"good": 0, "morning": 1}, "idf": [3.0, 4.0]}"#);
        let features = v.transform("good morning").unwrap();
        let entries = features.entries();
        assert!((entries[0].1 - 0.6).abs() < 1e-12);
        assert!((entries[1].1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_counts_without_norm() {
        let v = vectorizer(
            r#"{"vocabulary": {"hi": 0}, "idf": [2.0], "norm": null}"#,
        );
        assert_eq!(v.transform("hi hi hi").unwrap().entries(), &[(0, 6.0)]);
    }

    #[test]
    fn test_sublinear_tf() {
        let v = vectorizer(
            r#"{"vocabulary": {"hi": 0}, "idf": [1.0], "norm": null, "sublinear_tf": true}"#,
        );
        let value = v.transform("hi hi").unwrap().entries()[0].1;
        assert!((value - (1.0 + 2f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_bigrams_and_stop_words() {
        let v = vectorizer(
            r#"{
                "vocabulary": {"good": 0, "morning": 1, "good morning": 2},
                "idf": [1.0, 1.0, 1.0],
                "ngram_range": [1, 2],
                "stop_words": ["very"],
                "norm": null
            }"#,
        );
        let features = v.transform("good very morning").unwrap();
        assert_eq!(features.entries(), &[(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn test_out_of_vocabulary_is_empty() {
        let v = vectorizer(r#"{"vocabulary": {"hi": 0}, "idf": [1.0]}"#);
        let features = v.transform("nothing known here").unwrap();
        assert!(features.is_empty());
        assert_eq!(features.dimension(), 1);
    }

    #[test]
    fn test_rejects_inconsistent_artifacts() {
        let cases = vec![
            r#"{"vocabulary": {"hi": 0, "yo": 1}, "idf": [1.0]}"#,
            r#"{"vocabulary": {"hi": 0, "yo": 0}, "idf": [1.0, 1.0]}"#,
            r#"{"vocabulary": {"hi": 5}, "idf": [1.0]}"#,
            r#"{"vocabulary": {"hi": 0}, "idf": [1.0], "ngram_range": [2, 1]}"#,
            r#"{"vocabulary": {"hi": 0}, "idf": [1.0], "token_pattern": "("}"#,
            r#"{"vocabulary": []}"#,
        ];
        for c in cases {
            assert!(
                matches!(TfidfVectorizer::from_slice(c.as_bytes()), Err(ChatbotError::LoadError(_))),
                "expected load error for {}",
                c
            );
        }
    }
}
