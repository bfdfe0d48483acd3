//! Crime taxonomy and classification results.
//!
//! The category set is fixed: classifier output is mapped onto it
//! leniently, and anything unmappable lands in `Other` rather than
//! being rejected. A report is never dropped for classification
//! reasons.

use serde::{Deserialize, Serialize};

/// Fixed taxonomy of cybercrime categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrimeCategory {
    /// Phishing, scams, and other financial fraud
    PhishingFraud,
    /// Identity theft or impersonation
    IdentityTheft,
    /// Online harassment, stalking, or threats
    Harassment,
    /// Hacking or unauthorized account/system access
    Hacking,
    /// Doxxing or unwanted disclosure of personal data
    Doxxing,
    /// Ransomware or extortion
    Ransomware,
    /// Cybercrime not covered by the above
    Other,
    /// Classification unavailable (classifier failure or timeout)
    Unclassified,
}

impl CrimeCategory {
    /// All categories offered to the classifier (excludes the
    /// failure-only `Unclassified`).
    pub fn taxonomy() -> &'static [CrimeCategory] {
        &[
            CrimeCategory::PhishingFraud,
            CrimeCategory::IdentityTheft,
            CrimeCategory::Harassment,
            CrimeCategory::Hacking,
            CrimeCategory::Doxxing,
            CrimeCategory::Ransomware,
            CrimeCategory::Other,
        ]
    }

    /// Human-readable label, stable for downstream display.
    pub fn label(&self) -> &'static str {
        match self {
            CrimeCategory::PhishingFraud => "Phishing/Financial Fraud",
            CrimeCategory::IdentityTheft => "Identity Theft",
            CrimeCategory::Harassment => "Harassment",
            CrimeCategory::Hacking => "Hacking/Unauthorized Access",
            CrimeCategory::Doxxing => "Doxxing",
            CrimeCategory::Ransomware => "Ransomware/Extortion",
            CrimeCategory::Other => "Other",
            CrimeCategory::Unclassified => "Unclassified",
        }
    }

    /// Map free-form classifier output onto the taxonomy.
    ///
    /// Lenient: matches on characteristic substrings so that minor
    /// label drift in model output still lands on a category. Returns
    /// `None` only when nothing matches at all.
    pub fn from_label(label: &str) -> Option<CrimeCategory> {
        let lower = label.to_lowercase();

        if lower.contains("phish") || lower.contains("fraud") || lower.contains("scam") {
            return Some(CrimeCategory::PhishingFraud);
        }
        if lower.contains("identity") || lower.contains("imperson") {
            return Some(CrimeCategory::IdentityTheft);
        }
        if lower.contains("harass") || lower.contains("stalk") || lower.contains("threat") {
            return Some(CrimeCategory::Harassment);
        }
        if lower.contains("hack") || lower.contains("unauthorized") || lower.contains("breach") {
            return Some(CrimeCategory::Hacking);
        }
        if lower.contains("dox") {
            return Some(CrimeCategory::Doxxing);
        }
        if lower.contains("ransom") || lower.contains("extort") {
            return Some(CrimeCategory::Ransomware);
        }
        if lower.contains("unclassified") {
            return Some(CrimeCategory::Unclassified);
        }
        if lower.contains("other") {
            return Some(CrimeCategory::Other);
        }

        None
    }
}

impl std::fmt::Display for CrimeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A crime classification with confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Assigned category
    pub category: CrimeCategory,
    /// Classifier confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Below the configured confidence threshold; flagged for human
    /// review downstream, never rejected
    pub low_confidence: bool,
}

impl Classification {
    /// Create a classification, clamping confidence into 0..=1.
    pub fn new(category: CrimeCategory, confidence: f32) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            low_confidence: false,
        }
    }

    /// The fallback used when the classifier fails or times out.
    pub fn unclassified() -> Self {
        Self {
            category: CrimeCategory::Unclassified,
            confidence: 0.0,
            low_confidence: true,
        }
    }

    /// Apply a confidence threshold, flagging results below it.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        if self.confidence < threshold {
            self.low_confidence = true;
        }
        self
    }
}
