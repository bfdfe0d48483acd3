//! The assembled case record.
//!
//! Produced at most once per completed non-emergency call and
//! immutable thereafter. Handed to the storage/notification
//! collaborators; this workspace never mutates it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::caseid::CaseId;
use crate::identity::CallerId;
use crate::taxonomy::Classification;

/// A trackable case record for a completed non-emergency report.
///
/// `urgency_flag` is false by construction: the assembler refuses to
/// build a record for an urgent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Globally unique case identifier
    pub case_id: CaseId,
    /// Normalized caller identity
    pub caller_identity: CallerId,
    /// Caller's name (may be "unknown")
    pub name: String,
    /// Contact number for follow-up (may be "unknown")
    pub contact: String,
    /// Concatenated incident narrative
    pub narrative: String,
    /// Crime classification with confidence
    pub classification: Classification,
    /// Always false for an assembled record
    pub urgency_flag: bool,
    /// Incident date, when the caller volunteered one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<String>,
    /// Reported financial loss, when the caller volunteered one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_lost: Option<f64>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::CrimeCategory;

    #[test]
    fn test_record_serialization() {
        let record = CaseRecord {
            case_id: "CR-20250307-0001".parse().unwrap(),
            caller_identity: CallerId::Phone("+919876543210".to_string()),
            name: "Asha Rao".to_string(),
            contact: "9876543210".to_string(),
            narrative: "received a phishing email".to_string(),
            classification: Classification::new(CrimeCategory::PhishingFraud, 0.93),
            urgency_flag: false,
            incident_date: None,
            amount_lost: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("CR-20250307-0001"));
        assert!(!json.contains("incident_date"));

        let back: CaseRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
