//! The triage engine.
//!
//! Owns the per-call control flow: identity normalization, emergency
//! screening, the conversation state machine, classification, case
//! assembly, and the downstream handoffs. Shared across sessions; the
//! per-day case sequence is the only synchronized state. Each session
//! is driven through `&mut CallSession`, so turns within one call are
//! processed strictly in arrival order.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use casefile::{CallerId, CaseRecord, Classification, FieldValue};
use classifier_agent::CrimeClassifier;

use crate::assembler::CaseAssembler;
use crate::audit::{AuditEntry, IntakeAudit};
use crate::caseid_gen::CaseIdGenerator;
use crate::config::TriageConfig;
use crate::emergency::{EmergencyScreen, EmergencyVerdict};
use crate::handoff::{
    case_sms_body, CaseSink, EscalationEvent, EscalationRouter, FormLinks, SmsGateway,
};
use crate::machine::{transition, Effect, Event, Stage, TransitionCtx};
use crate::session::CallSession;
use crate::types::{Outcome, Result, Speaker, TriageError};

/// The agent's reply to one driven event: what it says next, and the
/// terminal outcome if the session just ended.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Lines the agent speaks, in order
    pub agent_lines: Vec<String>,
    /// Set exactly once, on the turn that ends the session
    pub outcome: Option<Outcome>,
}

/// Call-triage engine for the helpline.
pub struct TriageEngine {
    config: TriageConfig,
    screen: EmergencyScreen,
    classifier: Arc<CrimeClassifier>,
    assembler: CaseAssembler,
    case_ids: Arc<CaseIdGenerator>,
    form_links: FormLinks,
    sink: Arc<dyn CaseSink>,
    sms: Arc<dyn SmsGateway>,
    escalations: Arc<dyn EscalationRouter>,
    audit: IntakeAudit,
}

impl TriageEngine {
    /// Create an engine over its collaborators.
    pub fn new(
        config: TriageConfig,
        classifier: Arc<CrimeClassifier>,
        sink: Arc<dyn CaseSink>,
        sms: Arc<dyn SmsGateway>,
        escalations: Arc<dyn EscalationRouter>,
    ) -> Self {
        Self {
            screen: EmergencyScreen::new(&config.emergency),
            form_links: FormLinks::new(&config.notify),
            audit: IntakeAudit::new(config.engine.audit_max_entries),
            case_ids: Arc::new(CaseIdGenerator::new()),
            assembler: CaseAssembler::new(),
            config,
            classifier,
            sink,
            sms,
            escalations,
        }
    }

    /// The audit log of terminal sessions.
    pub fn audit(&self) -> &IntakeAudit {
        &self.audit
    }

    /// Start a call: normalize the caller identity, open a session,
    /// and deliver the greeting.
    pub async fn begin_call(&self, raw_caller_id: &str) -> (CallSession, TurnReply) {
        let caller = CallerId::normalize(raw_caller_id, &self.config.collection.default_country_code);
        let mut session = CallSession::new(caller);

        info!(
            engine_id = %self.config.engine.engine_id,
            session_id = %session.session_id(),
            caller = %session.caller(),
            fallback_identity = session.caller().is_fallback(),
            "Call started"
        );

        let reply = self.drive(&mut session, Event::CallConnected, None).await;
        (session, reply)
    }

    /// Process one caller turn.
    ///
    /// The turn is screened for emergency language before it reaches
    /// the state machine; a positive screen preempts whatever stage
    /// the conversation was in.
    pub async fn caller_turn(&self, session: &mut CallSession, text: &str) -> Result<TurnReply> {
        if session.stage().is_terminal() {
            return Err(TriageError::SessionClosed(session.session_id()));
        }

        session.push_turn(Speaker::Caller, text);

        let verdict = self.screen.screen(text);
        let reply = if verdict.urgent {
            session.mark_urgent();
            warn!(
                session_id = %session.session_id(),
                score = verdict.score,
                signals = ?verdict.signals,
                "Emergency detected, escalating"
            );
            self.drive(session, Event::EmergencyDetected, Some(verdict))
                .await
        } else {
            self.drive(session, Event::CallerSaid(text), None).await
        };

        Ok(reply)
    }

    /// Handle the caller hanging up. A session still mid-flow becomes
    /// `Failed` with its turns preserved for review; a session already
    /// terminal is left untouched.
    pub async fn disconnect(&self, session: &mut CallSession) -> TurnReply {
        if session.stage().is_terminal() {
            return TurnReply {
                agent_lines: vec![],
                outcome: session.outcome().cloned(),
            };
        }
        warn!(
            session_id = %session.session_id(),
            stage = ?session.stage(),
            "Caller disconnected mid-flow"
        );
        self.drive(session, Event::Disconnected, None).await
    }

    /// Feed one event through the state machine and execute the
    /// resulting effects, following any internally-generated events
    /// (classification, assembly) until the machine settles.
    async fn drive(
        &self,
        session: &mut CallSession,
        event: Event<'_>,
        verdict: Option<EmergencyVerdict>,
    ) -> TurnReply {
        let mut agent_lines = Vec::new();
        let mut assembled: Option<CaseRecord> = None;
        let mut pending = Some(event);

        while let Some(event) = pending.take() {
            let ctx = TransitionCtx {
                retries: session.retries(),
                max_retries: self.config.collection.max_retries,
            };
            let step = transition(session.stage(), event, ctx);

            if step.next == session.stage() {
                session.bump_retries();
            } else {
                session.reset_retries();
            }

            // Effects run against the pre-transition stage; field
            // writes are gated on it.
            for effect in step.effects {
                match effect {
                    Effect::Say(line) => {
                        session.push_turn(Speaker::Agent, &line);
                        agent_lines.push(line);
                    }
                    Effect::RecordField(kind, value) => {
                        session.record_field(kind, FieldValue::Provided(value));
                    }
                    Effect::MarkUnknown(kind) => {
                        info!(
                            session_id = %session.session_id(),
                            field = ?kind,
                            "Retries exhausted, recording field as unknown"
                        );
                        session.record_field(kind, FieldValue::Unknown);
                    }
                    Effect::RunClassifier => {
                        let classification = self.run_classifier(session).await;
                        session.set_classification(classification.clone());
                        pending = Some(Event::ClassificationReady(classification));
                    }
                    Effect::AssembleCase => {
                        match self.assembler.assemble(session, &self.case_ids) {
                            Ok(record) => {
                                self.save_case(&record).await;
                                pending = Some(Event::CaseAssembled(record.case_id.clone()));
                                assembled = Some(record);
                            }
                            Err(e) => {
                                error!(
                                    session_id = %session.session_id(),
                                    error = %e,
                                    "Case assembly failed"
                                );
                                pending = Some(Event::AssemblyFailed);
                            }
                        }
                    }
                    Effect::Escalate => {
                        self.route_escalation(session, verdict.as_ref()).await;
                    }
                    Effect::SendCaseSms => {
                        if let Some(record) = assembled.as_ref() {
                            self.send_case_sms(session, record).await;
                        }
                    }
                    Effect::SurfaceForReview => {
                        error!(
                            session_id = %session.session_id(),
                            caller = %session.caller(),
                            turns = session.turns().len(),
                            "Session flagged for manual review"
                        );
                    }
                }
            }

            session.set_stage(step.next);
        }

        let outcome = self.settle_outcome(session, assembled).await;
        TurnReply {
            agent_lines,
            outcome,
        }
    }

    /// Classify the session narrative, substituting the Unclassified
    /// fallback on any failure or timeout. The report proceeds either
    /// way.
    async fn run_classifier(&self, session: &CallSession) -> Classification {
        let narrative = session.narrative();
        let limit = Duration::from_millis(self.config.classifier.timeout_ms);

        match timeout(limit, self.classifier.classify(&narrative)).await {
            Ok(Ok(classification)) => classification,
            Ok(Err(e)) => {
                warn!(
                    session_id = %session.session_id(),
                    error = %e,
                    "Classifier failed, falling back to Unclassified"
                );
                Classification::unclassified()
            }
            Err(_) => {
                warn!(
                    session_id = %session.session_id(),
                    timeout_ms = self.config.classifier.timeout_ms,
                    "Classifier timed out, falling back to Unclassified"
                );
                Classification::unclassified()
            }
        }
    }

    /// Persist the record. Sink failure is logged and does not fail
    /// the call; the audit entry still carries the case id.
    async fn save_case(&self, record: &CaseRecord) {
        if let Err(e) = self.sink.save(record).await {
            warn!(case_id = %record.case_id, error = %e, "Case sink rejected record");
        }
    }

    async fn route_escalation(&self, session: &CallSession, verdict: Option<&EmergencyVerdict>) {
        let reason = verdict
            .map(|v| v.signals.join(", "))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "emergency language detected".to_string());

        let event = EscalationEvent {
            session_id: session.session_id(),
            reason,
            partial_narrative: session.caller_text(),
            at: chrono::Utc::now(),
        };
        if let Err(e) = self.escalations.route(event).await {
            error!(
                session_id = %session.session_id(),
                error = %e,
                "Escalation routing failed"
            );
        }
    }

    /// Send the confirmation SMS with the prefill link. Prefers the
    /// normalized caller number; falls back to the collected contact
    /// field. Delivery failure is logged, not retried.
    async fn send_case_sms(&self, session: &CallSession, record: &CaseRecord) {
        let recipient = match session.caller().phone() {
            Some(phone) => phone.to_string(),
            None if record.contact != "unknown" => format!(
                "+{}{}",
                self.config.collection.default_country_code, record.contact
            ),
            None => {
                warn!(
                    case_id = %record.case_id,
                    "No deliverable number for confirmation SMS, skipping"
                );
                return;
            }
        };

        let link = self.form_links.prefill_link(&record.case_id);
        let body = case_sms_body(&self.config.notify.sms_sender, &record.case_id, &link);

        match self.sms.send(&recipient, &body).await {
            Ok(()) => info!(case_id = %record.case_id, "Confirmation SMS sent"),
            Err(e) => warn!(case_id = %record.case_id, error = %e, "Confirmation SMS failed"),
        }
    }

    /// Map a terminal stage to its outcome, record it on the session,
    /// and write the audit entry.
    async fn settle_outcome(
        &self,
        session: &mut CallSession,
        assembled: Option<CaseRecord>,
    ) -> Option<Outcome> {
        let outcome = match session.stage() {
            Stage::Done => Outcome::Done(assembled.map(|r| r.case_id)?),
            Stage::Escalated => Outcome::Escalated,
            Stage::Declined => Outcome::Declined,
            Stage::Failed => Outcome::Failed,
            _ => return None,
        };

        session.set_outcome(outcome.clone());
        info!(
            session_id = %session.session_id(),
            outcome = ?outcome,
            turns = session.turns().len(),
            "Session reached terminal outcome"
        );

        if self.config.engine.audit_enabled {
            self.audit
                .record(AuditEntry::from_session(session, outcome.clone()))
                .await;
        }

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefile::CrimeCategory;
    use classifier_agent::MockBackend;

    use crate::handoff::{RecordingEscalations, RecordingSink, RecordingSms};

    struct Harness {
        engine: TriageEngine,
        sink: Arc<RecordingSink>,
        sms: Arc<RecordingSms>,
        escalations: Arc<RecordingEscalations>,
    }

    fn harness_with(backend: MockBackend, config: TriageConfig) -> Harness {
        let sink = Arc::new(RecordingSink::new());
        let sms = Arc::new(RecordingSms::new());
        let escalations = Arc::new(RecordingEscalations::new());
        let classifier = Arc::new(
            CrimeClassifier::new(Arc::new(backend))
                .with_threshold(config.classifier.confidence_threshold),
        );
        let engine = TriageEngine::new(
            config,
            classifier,
            Arc::clone(&sink) as Arc<dyn CaseSink>,
            Arc::clone(&sms) as Arc<dyn SmsGateway>,
            Arc::clone(&escalations) as Arc<dyn EscalationRouter>,
        );
        Harness {
            engine,
            sink,
            sms,
            escalations,
        }
    }

    fn phishing_harness() -> Harness {
        harness_with(
            MockBackend::default()
                .with_response(r#"{"category": "Phishing/Financial Fraud", "confidence": 0.93}"#),
            TriageConfig::new("test-engine"),
        )
    }

    #[tokio::test]
    async fn test_full_benign_flow_produces_case() {
        let h = phishing_harness();
        let (mut session, reply) = h.engine.begin_call("9876543210").await;
        assert_eq!(reply.agent_lines.len(), 1);
        assert_eq!(session.stage(), Stage::Consent);

        h.engine.caller_turn(&mut session, "yes, go ahead").await.unwrap();
        h.engine.caller_turn(&mut session, "Asha Rao").await.unwrap();
        h.engine.caller_turn(&mut session, "9876543210").await.unwrap();
        let reply = h
            .engine
            .caller_turn(&mut session, "I received a phishing email asking for my card details")
            .await
            .unwrap();

        let outcome = reply.outcome.expect("session should complete");
        let case_id = outcome.case_id().expect("completed session has a case id");
        let today = chrono::Utc::now().date_naive().format("%Y%m%d");
        assert_eq!(case_id.to_string(), format!("CR-{}-0001", today));

        // Record saved with the classification applied.
        assert_eq!(h.sink.save_count(), 1);
        let record = &h.sink.saved()[0];
        assert_eq!(record.name, "Asha Rao");
        assert_eq!(record.classification.category, CrimeCategory::PhishingFraud);
        assert!(!record.urgency_flag);

        // SMS to the caller's normalized number, carrying the link.
        let sent = h.sms.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+919876543210");
        assert!(sent[0].1.contains(&format!("/f/{}", case_id)));

        // The caller heard the case number before hangup.
        assert!(reply
            .agent_lines
            .iter()
            .any(|l| l.contains(&case_id.to_string())));
        assert_eq!(h.escalations.route_count(), 0);
    }

    #[tokio::test]
    async fn test_volunteered_date_and_amount_reach_the_record() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("9876543210").await;
        h.engine.caller_turn(&mut session, "yes, go ahead").await.unwrap();
        h.engine.caller_turn(&mut session, "Asha Rao").await.unwrap();
        h.engine.caller_turn(&mut session, "9876543210").await.unwrap();
        let reply = h
            .engine
            .caller_turn(
                &mut session,
                "Yesterday I got a phishing email and lost 5000 rupees",
            )
            .await
            .unwrap();

        assert!(matches!(reply.outcome, Some(Outcome::Done(_))));
        let record = &h.sink.saved()[0];
        let yesterday = (chrono::Utc::now().date_naive() - chrono::Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        assert_eq!(record.incident_date, Some(yesterday));
        assert_eq!(record.amount_lost, Some(5000.0));
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_the_call() {
        let sink = Arc::new(RecordingSink::new().with_failure());
        let sms = Arc::new(RecordingSms::new());
        let escalations = Arc::new(RecordingEscalations::new());
        let classifier = Arc::new(CrimeClassifier::new(Arc::new(
            MockBackend::default()
                .with_response(r#"{"category": "Phishing/Financial Fraud", "confidence": 0.93}"#),
        )));
        let engine = TriageEngine::new(
            TriageConfig::new("test-engine"),
            classifier,
            Arc::clone(&sink) as Arc<dyn CaseSink>,
            Arc::clone(&sms) as Arc<dyn SmsGateway>,
            Arc::clone(&escalations) as Arc<dyn EscalationRouter>,
        );

        let (mut session, _) = engine.begin_call("9876543210").await;
        engine.caller_turn(&mut session, "yes").await.unwrap();
        engine.caller_turn(&mut session, "Asha Rao").await.unwrap();
        engine.caller_turn(&mut session, "9876543210").await.unwrap();
        let reply = engine
            .caller_turn(&mut session, "I received a phishing email")
            .await
            .unwrap();

        // Storage rejected the record; the call outcome stands and the
        // caller still gets their case number and SMS.
        let outcome = reply.outcome.expect("session should complete");
        assert!(outcome.case_id().is_some());
        assert_eq!(sink.save_count(), 1);
        assert!(sink.saved().is_empty());
        assert_eq!(sms.send_count(), 1);
    }

    #[tokio::test]
    async fn test_emergency_escalates_before_collection_finishes() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("9876543210").await;

        h.engine.caller_turn(&mut session, "yes").await.unwrap();
        // Second caller turn, during name collection.
        let reply = h
            .engine
            .caller_turn(&mut session, "someone is draining my bank account right now")
            .await
            .unwrap();

        assert_eq!(reply.outcome, Some(Outcome::Escalated));
        assert!(session.is_urgent());
        assert_eq!(h.escalations.route_count(), 1);
        // No case record or SMS for an emergency.
        assert_eq!(h.sink.save_count(), 0);
        assert_eq!(h.sms.send_count(), 0);

        let routed = h.escalations.routed();
        assert!(routed[0].partial_narrative.contains("draining my bank account"));
    }

    #[tokio::test]
    async fn test_consent_declined_ends_quietly() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("9876543210").await;

        let reply = h
            .engine
            .caller_turn(&mut session, "no thank you")
            .await
            .unwrap();

        assert_eq!(reply.outcome, Some(Outcome::Declined));
        assert_eq!(h.sink.save_count(), 0);
        assert_eq!(h.escalations.route_count(), 0);
    }

    #[tokio::test]
    async fn test_classifier_timeout_falls_back_to_unclassified() {
        let mut config = TriageConfig::new("test-engine");
        config.classifier.timeout_ms = 50;
        let h = harness_with(
            MockBackend::default()
                .with_response(r#"{"category": "Other", "confidence": 0.9}"#)
                .with_delay(Duration::from_millis(500)),
            config,
        );

        let (mut session, _) = h.engine.begin_call("9876543210").await;
        h.engine.caller_turn(&mut session, "yes").await.unwrap();
        h.engine.caller_turn(&mut session, "Asha Rao").await.unwrap();
        h.engine.caller_turn(&mut session, "9876543210").await.unwrap();
        let reply = h
            .engine
            .caller_turn(&mut session, "my files were encrypted")
            .await
            .unwrap();

        // The case still completes, just without a classification.
        assert!(matches!(reply.outcome, Some(Outcome::Done(_))));
        let record = &h.sink.saved()[0];
        assert_eq!(record.classification.category, CrimeCategory::Unclassified);
        assert_eq!(record.classification.confidence, 0.0);
        assert!(record.classification.low_confidence);
    }

    #[tokio::test]
    async fn test_retries_exhausted_records_unknown_contact() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("anonymous").await;
        h.engine.caller_turn(&mut session, "yes").await.unwrap();
        h.engine.caller_turn(&mut session, "Asha Rao").await.unwrap();

        // Three unusable answers exhaust the contact retries.
        h.engine.caller_turn(&mut session, "I don't know").await.unwrap();
        h.engine.caller_turn(&mut session, "can't remember").await.unwrap();
        h.engine.caller_turn(&mut session, "really can't say").await.unwrap();
        assert_eq!(session.stage(), Stage::Collecting(casefile::FieldKind::IncidentDescription));

        let reply = h
            .engine
            .caller_turn(&mut session, "I received a phishing email")
            .await
            .unwrap();

        assert!(matches!(reply.outcome, Some(Outcome::Done(_))));
        let record = &h.sink.saved()[0];
        assert_eq!(record.contact, "unknown");
        // Fallback identity and unknown contact: no deliverable number.
        assert_eq!(h.sms.send_count(), 0);
    }

    #[tokio::test]
    async fn test_turn_after_terminal_is_rejected() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("9876543210").await;
        h.engine.caller_turn(&mut session, "no").await.unwrap();

        let err = h.engine.caller_turn(&mut session, "hello?").await.unwrap_err();
        assert!(matches!(err, TriageError::SessionClosed(_)));
    }

    #[tokio::test]
    async fn test_disconnect_mid_flow_fails_with_transcript() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("9876543210").await;
        h.engine.caller_turn(&mut session, "yes").await.unwrap();
        h.engine.caller_turn(&mut session, "Asha Rao").await.unwrap();

        let reply = h.engine.disconnect(&mut session).await;
        assert_eq!(reply.outcome, Some(Outcome::Failed));

        let entry = h.engine.audit().get(session.session_id()).await.unwrap();
        assert_eq!(entry.outcome, Outcome::Failed);
        let transcript = entry.transcript.expect("failed sessions keep transcripts");
        assert!(transcript.iter().any(|t| t.text == "Asha Rao"));
    }

    #[tokio::test]
    async fn test_disconnect_after_terminal_is_a_noop() {
        let h = phishing_harness();
        let (mut session, _) = h.engine.begin_call("9876543210").await;
        h.engine.caller_turn(&mut session, "no").await.unwrap();

        let reply = h.engine.disconnect(&mut session).await;
        assert_eq!(reply.outcome, Some(Outcome::Declined));
        let stats = h.engine.audit().stats().await;
        assert_eq!(stats.total_sessions, 1);
    }

    #[tokio::test]
    async fn test_sequential_cases_get_distinct_ids() {
        let h = phishing_harness();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let (mut session, _) = h.engine.begin_call("9876543210").await;
            h.engine.caller_turn(&mut session, "yes").await.unwrap();
            h.engine.caller_turn(&mut session, "Asha Rao").await.unwrap();
            h.engine.caller_turn(&mut session, "9876543210").await.unwrap();
            let reply = h
                .engine
                .caller_turn(&mut session, "I received a phishing email")
                .await
                .unwrap();
            ids.push(reply.outcome.unwrap().case_id().unwrap().to_string());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
