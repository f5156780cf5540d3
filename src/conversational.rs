//! Conversational turn handling
//!
//! One call: normalize → classify → select → log (best effort) → done.
//! Classification failures abort the call; a failed log append is reported
//! in the outcome and the response is still returned.

use crate::audit::{CsvLogStore, LogStore};
use crate::catalog::IntentCatalog;
use crate::classifier::ClassifierPipeline;
use crate::config::ChatbotConfig;
use crate::memory::SessionHistory;
use crate::models::{is_farewell, CallPhase, ChatOutcome, Interaction};
use crate::selector::select_response;
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct Chatbot {
    catalog: Arc<IntentCatalog>,
    pipeline: Arc<ClassifierPipeline>,
    log_store: Arc<dyn LogStore>,
    rng: Mutex<StdRng>,
}

impl Chatbot {
    pub fn new(
        catalog: Arc<IntentCatalog>,
        pipeline: Arc<ClassifierPipeline>,
        log_store: Arc<dyn LogStore>,
    ) -> Self {
        let unmapped: Vec<&str> = pipeline
            .labels()
            .iter()
            .map(String::as_str)
            .filter(|label| catalog.get(label).is_none())
            .collect();
        if !unmapped.is_empty() {
            warn!(
                labels = ?unmapped,
                "Classifier labels without catalog entries will use the fallback response"
            );
        }

        Self {
            catalog,
            pipeline,
            log_store,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Load catalog, model artifacts and the CSV log sink from configuration
    pub fn from_config(config: &ChatbotConfig) -> Result<Self> {
        let catalog = IntentCatalog::load(&config.intents_path)?;
        let pipeline = ClassifierPipeline::load(&config.vectorizer_path, &config.model_path)?;
        let log_store = CsvLogStore::new(&config.log_path);

        info!(log_path = %config.log_path.display(), "Chatbot ready");

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(pipeline),
            Arc::new(log_store),
        ))
    }

    /// Replace the entropy-seeded generator
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    /// Stateless entry point: classify and pick a response.
    /// An unknown tag yields the fallback string, never an error.
    pub fn chatbot(&self, text: &str) -> Result<String> {
        debug!(phase = %CallPhase::Normalizing, input = %text, "Input received");
        debug!(phase = %CallPhase::Classifying, "Classifying input");
        let tag = self.pipeline.predict_tag(text).map_err(|e| {
            warn!(phase = %CallPhase::Failed, error = %e, "Classification failed");
            e
        })?;

        debug!(phase = %CallPhase::Selecting, tag = %tag, "Selecting response");
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(select_response(&tag, &self.catalog, &mut *rng))
    }

    /// Full turn: respond, record in the session history, append to the log
    pub async fn converse(&self, text: &str, history: &mut SessionHistory) -> Result<ChatOutcome> {
        let response = self.chatbot(text)?;
        let interaction = Interaction::new(text, response);

        history.append(interaction.clone());

        debug!(phase = %CallPhase::Logging, "Appending interaction to log");
        let log_error = match self.log_store.record(&interaction).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    session_id = %history.session_id,
                    error = %e,
                    "Interaction log append failed, response will still be returned"
                );
                Some(e.to_string())
            }
        };

        let end_of_session = is_farewell(&interaction.response);
        debug!(phase = %CallPhase::Done, end_of_session, "Turn complete");

        Ok(ChatOutcome {
            interaction,
            end_of_session,
            log_error,
        })
    }
}
