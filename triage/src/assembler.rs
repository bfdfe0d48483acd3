//! Case record assembly.
//!
//! Builds the immutable `CaseRecord` from a completed session. The
//! assembler re-checks the invariants the state machine should have
//! enforced; a violation here is a programming error and fails the
//! attempt loudly instead of producing a record that contradicts the
//! escalation rules.

use chrono::Utc;
use tracing::{error, info, warn};

use casefile::{enrich, CaseRecord, FieldKind, FieldValue};

use crate::caseid_gen::CaseIdGenerator;
use crate::session::CallSession;
use crate::types::{Result, TriageError};

/// Assembles case records for completed non-emergency sessions.
#[derive(Debug, Default)]
pub struct CaseAssembler;

impl CaseAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build and number the case record for a session.
    ///
    /// Refuses an urgent session: urgent calls escalate and never
    /// produce a record. Refuses a session with no classification: the
    /// machine runs the classifier (with its Unclassified fallback)
    /// before assembly, so absence means a broken flow.
    pub fn assemble(
        &self,
        session: &CallSession,
        generator: &CaseIdGenerator,
    ) -> Result<CaseRecord> {
        if session.is_urgent() {
            error!(
                session_id = %session.session_id(),
                "Refusing to assemble a case for an urgent session"
            );
            return Err(TriageError::Invariant(
                "case assembly reached with urgency flag set".to_string(),
            ));
        }

        let classification = session.classification().cloned().ok_or_else(|| {
            error!(
                session_id = %session.session_id(),
                "Case assembly reached without a classification"
            );
            TriageError::Invariant("case assembly reached without a classification".to_string())
        })?;

        let today = Utc::now().date_naive();
        let case_id = generator.next(today)?;

        // Volunteered details are picked up from everything the
        // caller said, not just the description answer.
        let spoken = session.caller_text();

        let record = CaseRecord {
            case_id: case_id.clone(),
            caller_identity: session.caller().clone(),
            name: field_text(session, FieldKind::Name),
            contact: field_text(session, FieldKind::Contact),
            narrative: session.narrative(),
            classification,
            urgency_flag: false,
            incident_date: enrich::incident_date(&spoken, today),
            amount_lost: enrich::amount_lost(&spoken),
            created_at: Utc::now(),
        };

        info!(
            case_id = %record.case_id,
            category = %record.classification.category,
            low_confidence = record.classification.low_confidence,
            "Case record assembled"
        );
        Ok(record)
    }
}

/// Collected field as text. A field missing entirely at assembly time
/// is downgraded to `unknown` rather than aborting a report that is
/// otherwise complete.
fn field_text(session: &CallSession, kind: FieldKind) -> String {
    match session.field(kind) {
        Some(value) => value.as_str().to_string(),
        None => {
            warn!(
                session_id = %session.session_id(),
                field = ?kind,
                "Field missing at assembly; recording as unknown"
            );
            FieldValue::Unknown.as_str().to_string()
        }
    }
}
