//! Intent Classifier
//!
//! Maps a raw utterance to exactly one intent tag:
//! normalize → feature extractor → label classifier.
//!
//! Both halves are trained offline and loaded once; they are immutable and
//! stateless per call, so the pipeline can be shared freely behind an `Arc`.

mod linear;
mod tfidf;

pub use linear::LinearClassifier;
pub use tfidf::{Norm, TfidfVectorizer};

use crate::error::ChatbotError;
use crate::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

//
// ================= Features =================
//

/// Sparse feature vector, entries sorted by index
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dimension: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Entries are sorted; duplicate indices are summed
    pub fn new(dimension: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(index, _)| *index);
        entries.dedup_by(|next, prev| {
            if next.0 == prev.0 {
                prev.1 += next.1;
                true
            } else {
                false
            }
        });
        Self { dimension, entries }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps normalized text to a fixed-shape feature vector
pub trait FeatureExtractor: Send + Sync {
    fn dimension(&self) -> usize;
    fn transform(&self, text: &str) -> Result<FeatureVector>;
}

/// Maps a feature vector to exactly one label
pub trait LabelClassifier: Send + Sync {
    fn n_features(&self) -> usize;
    fn labels(&self) -> &[String];
    fn predict(&self, features: &FeatureVector) -> Result<String>;
}

//
// ================= Pipeline =================
//

/// SHA-256 digests of the artifacts a pipeline was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFingerprint {
    pub vectorizer_sha256: String,
    pub classifier_sha256: String,
}

pub struct ClassifierPipeline {
    extractor: Box<dyn FeatureExtractor>,
    classifier: Box<dyn LabelClassifier>,
    fingerprint: Option<ModelFingerprint>,
}

impl ClassifierPipeline {
    /// Pair an extractor with a classifier trained against the same vocabulary
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        classifier: Box<dyn LabelClassifier>,
    ) -> Result<Self> {
        if extractor.dimension() != classifier.n_features() {
            return Err(ChatbotError::LoadError(format!(
                "Feature extractor produces {} features but classifier expects {}",
                extractor.dimension(),
                classifier.n_features()
            )));
        }

        Ok(Self {
            extractor,
            classifier,
            fingerprint: None,
        })
    }

    /// Load the exported TF-IDF vectorizer and linear model artifacts
    pub fn load(vectorizer_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> Result<Self> {
        let vectorizer_bytes = read_artifact(vectorizer_path.as_ref())?;
        let model_bytes = read_artifact(model_path.as_ref())?;

        let extractor = TfidfVectorizer::from_slice(&vectorizer_bytes)?;
        let classifier = LinearClassifier::from_slice(&model_bytes)?;

        let fingerprint = ModelFingerprint {
            vectorizer_sha256: hex::encode(Sha256::digest(&vectorizer_bytes)),
            classifier_sha256: hex::encode(Sha256::digest(&model_bytes)),
        };

        info!(
            features = extractor.dimension(),
            labels = classifier.labels().len(),
            vectorizer_sha256 = %fingerprint.vectorizer_sha256,
            classifier_sha256 = %fingerprint.classifier_sha256,
            "Classifier pipeline loaded"
        );

        let mut pipeline = Self::new(Box::new(extractor), Box::new(classifier))?;
        pipeline.fingerprint = Some(fingerprint);
        Ok(pipeline)
    }

    pub fn fingerprint(&self) -> Option<&ModelFingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        self.classifier.labels()
    }

    /// Predict the intent tag for a raw utterance
    pub fn predict_tag(&self, raw_text: &str) -> Result<String> {
        let normalized = normalize(raw_text);
        let features = self.extractor.transform(&normalized)?;

        if features.dimension() != self.classifier.n_features() {
            return Err(ChatbotError::ClassificationError(format!(
                "Feature vector has dimension {}, classifier expects {}",
                features.dimension(),
                self.classifier.n_features()
            )));
        }

        let tag = self.classifier.predict(&features)?;
        debug!(input = %normalized, tag = %tag, "Predicted intent");
        Ok(tag)
    }
}

/// Lower-case and trim; idempotent
pub fn normalize(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        ChatbotError::LoadError(format!(
            "Failed to read model artifact {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small hand-built model shared by tests across the crate

    use super::*;

    pub const VECTORIZER_JSON: &str = r#"{
        "vocabulary": {"hello": 0, "hi": 1, "hey": 2, "bye": 3, "goodbye": 4, "thanks": 5, "weather": 6},
        "idf": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
    }"#;

    pub const MODEL_JSON: &str = r#"{
        "classes": ["goodbye", "greeting", "thanks", "unknown_xyz"],
        "coef": [
            [0.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0],
            [2.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0]
        ],
        "intercept": [0.0, 0.1, 0.0, 0.0]
    }"#;

    pub fn pipeline() -> ClassifierPipeline {
        let extractor = TfidfVectorizer::from_slice(VECTORIZER_JSON.as_bytes()).unwrap();
        let classifier = LinearClassifier::from_slice(MODEL_JSON.as_bytes()).unwrap();
        ClassifierPipeline::new(Box::new(extractor), Box::new(classifier)).unwrap()
    }
}
