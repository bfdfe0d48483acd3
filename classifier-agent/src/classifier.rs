//! The crime classifier service.
//!
//! Wraps an [`LlmBackend`] with prompt construction, response parsing,
//! and confidence thresholding. Classification failure is a typed,
//! recoverable outcome: the triage layer substitutes the
//! `Unclassified` fallback and the session continues.

use std::sync::Arc;
use tracing::{debug, warn};

use casefile::{Classification, CrimeCategory};

use crate::backend::{CompletionRequest, LlmBackend, LlmError};
use crate::prompt::PromptAssembler;

/// Error types for classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Nothing to classify
    #[error("Empty narrative")]
    EmptyNarrative,

    /// Backend call failed
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// Backend answered, but not in the required shape
    #[error("Unparseable classifier response: {0}")]
    Parse(String),
}

/// LLM-backed crime classifier over a fixed taxonomy.
pub struct CrimeClassifier {
    backend: Arc<dyn LlmBackend>,
    threshold: f32,
    max_tokens: u32,
}

impl CrimeClassifier {
    /// Create a classifier over the given backend.
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            threshold: 0.6,
            max_tokens: 128,
        }
    }

    /// Set the low-confidence threshold.
    ///
    /// Results below it are accepted but flagged for human review,
    /// never rejected.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// The configured confidence threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify an incident narrative.
    pub async fn classify(&self, narrative: &str) -> Result<Classification, ClassifyError> {
        if narrative.trim().is_empty() {
            return Err(ClassifyError::EmptyNarrative);
        }

        let request = CompletionRequest::user(PromptAssembler::build_narrative_prompt(narrative))
            .with_system(PromptAssembler::build_system_prompt())
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_json_output();

        let completion = self.backend.complete(request).await?;

        let classification = Self::parse_response(&completion.content)?;

        debug!(
            backend = self.backend.id(),
            category = %classification.category,
            confidence = classification.confidence,
            "Narrative classified"
        );

        Ok(classification.with_threshold(self.threshold))
    }

    /// Parse the model's JSON answer into a classification.
    ///
    /// Tolerant of surrounding prose and fenced code blocks; the
    /// category label is matched leniently against the taxonomy.
    fn parse_response(content: &str) -> Result<Classification, ClassifyError> {
        let json = extract_json_object(content)
            .ok_or_else(|| ClassifyError::Parse("no JSON object in response".to_string()))?;

        let data: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ClassifyError::Parse(e.to_string()))?;

        let label = data
            .get("category")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ClassifyError::Parse("missing category field".to_string()))?;

        let category = CrimeCategory::from_label(label).unwrap_or_else(|| {
            warn!(label = label, "Classifier label outside taxonomy, mapping to Other");
            CrimeCategory::Other
        });

        let confidence = data
            .get("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as f32;

        Ok(Classification::new(category, confidence))
    }
}

/// Find the first JSON object in possibly-decorated model output.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}
