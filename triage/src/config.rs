//! Configuration for the triage engine.
//!
//! The emergency phrase list, confidence threshold, retry bound, and
//! classifier timeout are deliberately configuration, not hard-coded
//! logic. Defaults are conservative: when in doubt, escalate.

use serde::{Deserialize, Serialize};

/// Configuration for a triage engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Engine identity
    pub engine: EngineConfig,
    /// Emergency screening configuration
    pub emergency: EmergencyConfig,
    /// Field collection configuration
    pub collection: CollectionConfig,
    /// Crime classifier configuration
    pub classifier: ClassifierConfig,
    /// Notification configuration
    pub notify: NotifyConfig,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            emergency: EmergencyConfig::default(),
            collection: CollectionConfig::default(),
            classifier: ClassifierConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl TriageConfig {
    /// Create a new config with an engine ID.
    pub fn new(engine_id: impl Into<String>) -> Self {
        Self {
            engine: EngineConfig {
                engine_id: engine_id.into(),
                ..EngineConfig::default()
            },
            ..Default::default()
        }
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Engine identity and audit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine instance ID
    pub engine_id: String,
    /// Enable the session audit log
    pub audit_enabled: bool,
    /// Maximum audit entries to retain
    pub audit_max_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_id: uuid::Uuid::new_v4().to_string(),
            audit_enabled: true,
            audit_max_entries: 10_000,
        }
    }
}

/// Emergency screening configuration.
///
/// A phrase hit escalates immediately. Keyword weights accumulate over
/// the latest caller turn and escalate once the score reaches
/// `score_threshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Phrases that indicate an ongoing emergency; any hit escalates
    pub phrases: Vec<String>,
    /// Weighted urgency keywords
    pub keywords: Vec<WeightedKeyword>,
    /// Score at which accumulated keyword weight escalates
    pub score_threshold: f32,
}

/// A keyword with its urgency weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedKeyword {
    /// Keyword matched as a lowercase substring
    pub word: String,
    /// Weight (0.0 - 1.0)
    pub weight: f32,
}

impl WeightedKeyword {
    fn new(word: &str, weight: f32) -> Self {
        Self {
            word: word.to_string(),
            weight,
        }
    }
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            phrases: [
                "right now",
                "happening now",
                "in progress",
                "as we speak",
                "still going on",
                "emergency",
                "threatening",
                "threatened me",
                "ransom",
                "draining my",
                "being drained",
                "at my house",
                "at my door",
                "hurt me",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            keywords: vec![
                WeightedKeyword::new("bank", 0.4),
                WeightedKeyword::new("money", 0.3),
                WeightedKeyword::new("transfer", 0.5),
                WeightedKeyword::new("ongoing", 0.8),
                WeightedKeyword::new("urgent", 0.6),
                WeightedKeyword::new("scared", 0.4),
                WeightedKeyword::new("police", 0.5),
            ],
            score_threshold: 1.0,
        }
    }
}

/// Field collection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Re-prompts allowed per field before recording `unknown`
    pub max_retries: u8,
    /// Country code assumed for bare 10-digit numbers
    pub default_country_code: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_country_code: "91".to_string(),
        }
    }
}

/// Crime classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Results below this confidence are flagged for human review
    pub confidence_threshold: f32,
    /// Classifier call timeout; on expiry the case falls back to
    /// Unclassified
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            timeout_ms: 8000,
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Base URL for the pre-filled web form
    pub form_base_url: String,
    /// SMS sender identity
    pub sms_sender: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            form_base_url: "http://localhost:5000".to_string(),
            sms_sender: "SafeLine".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TriageConfig::default();
        assert_eq!(config.collection.max_retries, 3);
        assert_eq!(config.classifier.timeout_ms, 8000);
        assert!(config.engine.audit_enabled);
        assert!(config.emergency.phrases.iter().any(|p| p == "right now"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = TriageConfig::new("test-engine");
        let yaml = config.to_yaml().unwrap();
        let parsed = TriageConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.engine.engine_id, "test-engine");
        assert_eq!(parsed.emergency.phrases, config.emergency.phrases);
    }
}
