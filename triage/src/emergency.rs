//! Emergency screening.
//!
//! Scans each caller turn for urgency signals: ongoing-threat phrasing
//! and weighted urgency keywords. The decision is deliberately
//! conservative toward escalation - an unnecessary human handoff is
//! far cheaper than a missed emergency.

use tracing::debug;

use crate::config::EmergencyConfig;

/// Verdict from screening one caller turn.
#[derive(Debug, Clone)]
pub struct EmergencyVerdict {
    /// Whether the turn indicates an active emergency
    pub urgent: bool,
    /// Accumulated keyword score
    pub score: f32,
    /// Matched signals, for the escalation event and audit
    pub signals: Vec<String>,
}

impl EmergencyVerdict {
    fn calm() -> Self {
        Self {
            urgent: false,
            score: 0.0,
            signals: vec![],
        }
    }
}

/// Screens caller turns for emergency language.
pub struct EmergencyScreen {
    phrases: Vec<String>,
    keywords: Vec<(String, f32)>,
    score_threshold: f32,
}

impl EmergencyScreen {
    /// Build a screen from configuration.
    pub fn new(config: &EmergencyConfig) -> Self {
        Self {
            phrases: config.phrases.iter().map(|p| p.to_lowercase()).collect(),
            keywords: config
                .keywords
                .iter()
                .map(|k| (k.word.to_lowercase(), k.weight))
                .collect(),
            score_threshold: config.score_threshold,
        }
    }

    /// Screen the latest caller turn.
    ///
    /// Any phrase hit is urgent on its own. Keyword weights accumulate
    /// over the turn and escalate once they reach the configured
    /// threshold.
    pub fn screen(&self, latest_turn: &str) -> EmergencyVerdict {
        let text = latest_turn.to_lowercase();
        if text.trim().is_empty() {
            return EmergencyVerdict::calm();
        }

        let mut signals = Vec::new();

        for phrase in &self.phrases {
            if text.contains(phrase.as_str()) {
                debug!(phrase = %phrase, "Emergency phrase matched");
                signals.push(format!("phrase: '{}'", phrase));
            }
        }

        let mut score = 0.0f32;
        for (word, weight) in &self.keywords {
            if text.contains(word.as_str()) {
                score += weight;
                signals.push(format!("keyword: '{}' (+{:.1})", word, weight));
            }
        }

        let phrase_hit = signals.iter().any(|s| s.starts_with("phrase:"));
        let urgent = phrase_hit || score >= self.score_threshold;

        EmergencyVerdict {
            urgent,
            score,
            signals,
        }
    }
}
