//! Linear label classifier loaded from an exported model
//!
//! Covers one-vs-rest logistic regression and linear SVM exports: one
//! coefficient row per class, or a single row for the binary case.

use super::{FeatureVector, LabelClassifier};
use crate::error::ChatbotError;
use crate::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LinearClassifier {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    n_features: usize,
}

impl LinearClassifier {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| ChatbotError::LoadError(format!("Malformed classifier artifact: {}", e)))?;
        Self::new(artifact.classes, artifact.coef, artifact.intercept)
    }

    pub fn new(classes: Vec<String>, coef: Vec<Vec<f64>>, intercept: Vec<f64>) -> Result<Self> {
        if classes.is_empty() {
            return Err(ChatbotError::LoadError("Classifier has no classes".into()));
        }

        let binary = classes.len() == 2 && coef.len() == 1;
        if coef.len() != classes.len() && !binary {
            return Err(ChatbotError::LoadError(format!(
                "Classifier has {} classes but {} coefficient rows",
                classes.len(),
                coef.len()
            )));
        }

        if intercept.len() != coef.len() {
            return Err(ChatbotError::LoadError(format!(
                "Classifier has {} coefficient rows but {} intercepts",
                coef.len(),
                intercept.len()
            )));
        }

        let n_features = coef[0].len();
        if let Some(row) = coef.iter().position(|r| r.len() != n_features) {
            return Err(ChatbotError::LoadError(format!(
                "Coefficient row {} has {} weights, expected {}",
                row,
                coef[row].len(),
                n_features
            )));
        }

        Ok(Self {
            classes,
            coef,
            intercept,
            n_features,
        })
    }

    fn decision(&self, row: usize, features: &FeatureVector) -> Result<f64> {
        let weights = &self.coef[row];
        let mut score = self.intercept[row];

        for &(index, value) in features.entries() {
            let weight = weights.get(index).ok_or_else(|| {
                ChatbotError::ClassificationError(format!(
                    "Feature index {} outside classifier width {}",
                    index, self.n_features
                ))
            })?;
            score += weight * value;
        }

        if !score.is_finite() {
            return Err(ChatbotError::ClassificationError(format!(
                "Non-finite decision score for class row {}",
                row
            )));
        }

        Ok(score)
    }
}

impl LabelClassifier for LinearClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn labels(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, features: &FeatureVector) -> Result<String> {
        if self.coef.len() == 1 && self.classes.len() == 2 {
            let score = self.decision(0, features)?;
            let index = if score > 0.0 { 1 } else { 0 };
            return Ok(self.classes[index].clone());
        }

        let mut best = 0;
        let mut best_score = self.decision(0, features)?;
        for row in 1..self.coef.len() {
            let score = self.decision(row, features)?;
            if score > best_score {
                best = row;
                best_score = score;
            }
        }

        Ok(self.classes[best].clone())
    }
}
