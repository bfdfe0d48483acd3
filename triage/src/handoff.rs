//! Downstream collaborators.
//!
//! Storage, SMS delivery, and human escalation live behind async
//! traits; the engine composes messages and routes events but never
//! sees a transport. In-memory recording implementations back the
//! tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use casefile::{CaseId, CaseRecord};

use crate::config::NotifyConfig;

/// Error from a downstream collaborator.
///
/// The engine treats all of these as non-fatal: the failure is logged
/// and the call outcome stands.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    /// The collaborator rejected or failed the request
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The collaborator is unreachable
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Receives assembled case records for storage.
#[async_trait]
pub trait CaseSink: Send + Sync {
    async fn save(&self, record: &CaseRecord) -> Result<(), HandoffError>;
}

/// Sends the post-call confirmation SMS.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<(), HandoffError>;
}

/// Routes emergency escalations to the human operator queue.
#[async_trait]
pub trait EscalationRouter: Send + Sync {
    async fn route(&self, event: EscalationEvent) -> Result<(), HandoffError>;
}

/// An emergency handoff to a human operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationEvent {
    /// Session that triggered the escalation
    pub session_id: uuid::Uuid,
    /// Matched emergency signals
    pub reason: String,
    /// Whatever the caller said before the handoff
    pub partial_narrative: String,
    /// When the escalation fired
    pub at: DateTime<Utc>,
}

/// Builds the pre-filled review form links.
#[derive(Debug, Clone)]
pub struct FormLinks {
    base_url: String,
}

impl FormLinks {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            base_url: config.form_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Link to the pre-filled form for a case.
    pub fn prefill_link(&self, case_id: &CaseId) -> String {
        format!("{}/f/{}", self.base_url, case_id)
    }
}

/// The confirmation SMS sent after a case is registered.
pub fn case_sms_body(sender: &str, case_id: &CaseId, link: &str) -> String {
    format!(
        "{}: Your cybercrime report has been registered as case {}. \
         Review and complete the details here: {}",
        sender, case_id, link
    )
}

/// Recording case sink for tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    saved: Mutex<Vec<CaseRecord>>,
    save_count: AtomicU32,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail, for failure-path tests.
    pub fn with_failure(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<CaseRecord> {
        self.saved.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CaseSink for RecordingSink {
    async fn save(&self, record: &CaseRecord) -> Result<(), HandoffError> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HandoffError::Unavailable("recording sink set to fail".into()));
        }
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(record.clone());
        }
        Ok(())
    }
}

/// Recording SMS gateway for tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    send_count: AtomicU32,
    fail: AtomicBool,
}

impl RecordingSms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn send_count(&self) -> u32 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Sent messages as (recipient, body) pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, to: &str, message: &str) -> Result<(), HandoffError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HandoffError::DeliveryFailed("recording sms set to fail".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), message.to_string()));
        }
        Ok(())
    }
}

/// Recording escalation router for tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingEscalations {
    routed: Mutex<Vec<EscalationEvent>>,
    route_count: AtomicU32,
}

impl RecordingEscalations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_count(&self) -> u32 {
        self.route_count.load(Ordering::SeqCst)
    }

    pub fn routed(&self) -> Vec<EscalationEvent> {
        self.routed.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EscalationRouter for RecordingEscalations {
    async fn route(&self, event: EscalationEvent) -> Result<(), HandoffError> {
        self.route_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut routed) = self.routed.lock() {
            routed.push(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefill_link_format() {
        let links = FormLinks::new(&NotifyConfig::default());
        let case_id: CaseId = "CR-20250115-0007".parse().unwrap();
        assert_eq!(
            links.prefill_link(&case_id),
            "http://localhost:5000/f/CR-20250115-0007"
        );
    }

    #[test]
    fn test_prefill_link_trims_trailing_slash() {
        let config = NotifyConfig {
            form_base_url: "https://forms.example.org/".to_string(),
            ..NotifyConfig::default()
        };
        let links = FormLinks::new(&config);
        let case_id: CaseId = "CR-20250115-0001".parse().unwrap();
        assert_eq!(
            links.prefill_link(&case_id),
            "https://forms.example.org/f/CR-20250115-0001"
        );
    }

    #[test]
    fn test_sms_body_contains_case_and_link() {
        let case_id: CaseId = "CR-20250115-0007".parse().unwrap();
        let body = case_sms_body("SafeLine", &case_id, "http://localhost:5000/f/CR-20250115-0007");
        assert!(body.starts_with("SafeLine:"));
        assert!(body.contains("CR-20250115-0007"));
        assert!(body.contains("/f/CR-20250115-0007"));
    }

    #[tokio::test]
    async fn test_recording_sms_counts_failures_too() {
        let sms = RecordingSms::new().with_failure();
        let result = sms.send("+919876543210", "hello").await;
        assert!(result.is_err());
        assert_eq!(sms.send_count(), 1);
        assert!(sms.sent().is_empty());
    }

    #[tokio::test]
    async fn test_recording_escalations() {
        let router = RecordingEscalations::new();
        router
            .route(EscalationEvent {
                session_id: uuid::Uuid::new_v4(),
                reason: "phrase: 'right now'".to_string(),
                partial_narrative: "it is happening right now".to_string(),
                at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(router.route_count(), 1);
        assert_eq!(router.routed().len(), 1);
    }
}
