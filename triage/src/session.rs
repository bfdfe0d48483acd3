//! Per-call session state.
//!
//! One `CallSession` per active call, mutated only by the engine
//! during that call. The caller identity is immutable once assigned,
//! turns are append-only, field values are writable only while their
//! stage is active, and the urgency flag is monotonic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use casefile::{CallerId, Classification, FieldKind, FieldValue};

use crate::machine::Stage;
use crate::types::{Outcome, Speaker, Turn};

/// The live state of one call, from greeting to terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    session_id: uuid::Uuid,
    caller: CallerId,
    stage: Stage,
    turns: Vec<Turn>,
    fields: HashMap<FieldKind, FieldValue>,
    retries: u8,
    urgency_flag: bool,
    classification: Option<Classification>,
    outcome: Option<Outcome>,
    started_at: DateTime<Utc>,
}

impl CallSession {
    /// Create a session for a normalized caller identity.
    pub fn new(caller: CallerId) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4(),
            caller,
            stage: Stage::Greeting,
            turns: Vec::new(),
            fields: HashMap::new(),
            retries: 0,
            urgency_flag: false,
            classification: None,
            outcome: None,
            started_at: Utc::now(),
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// The caller identity assigned at call start.
    pub fn caller(&self) -> &CallerId {
        &self.caller
    }

    /// Current conversation stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// All turns so far, in order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Whether the emergency screen ever fired for this session.
    pub fn is_urgent(&self) -> bool {
        self.urgency_flag
    }

    /// The classification, once set.
    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    /// Terminal outcome, once reached.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// When the call started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// A collected field value.
    pub fn field(&self, kind: FieldKind) -> Option<&FieldValue> {
        self.fields.get(&kind)
    }

    /// The incident narrative used for classification.
    ///
    /// The validated incident description when the caller provided
    /// one; otherwise all caller turns joined, so classification never
    /// runs on an empty string while turns exist.
    pub fn narrative(&self) -> String {
        if let Some(FieldValue::Provided(text)) = self.fields.get(&FieldKind::IncidentDescription) {
            return text.clone();
        }
        self.caller_text()
    }

    /// All caller turns joined; used as the partial narrative on
    /// escalation and for audit.
    pub fn caller_text(&self) -> String {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::Caller)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn push_turn(&mut self, speaker: Speaker, text: &str) {
        self.turns.push(Turn::new(speaker, text));
    }

    /// Record a field value. Only honored while that field's stage is
    /// active; writes outside the active stage are dropped.
    pub(crate) fn record_field(&mut self, kind: FieldKind, value: FieldValue) {
        if self.stage == Stage::Collecting(kind) {
            self.fields.insert(kind, value);
        }
    }

    /// Set the urgency flag. Monotonic: never reset once true.
    pub(crate) fn mark_urgent(&mut self) {
        self.urgency_flag = true;
    }

    pub(crate) fn set_classification(&mut self, classification: Classification) {
        self.classification = Some(classification);
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn retries(&self) -> u8 {
        self.retries
    }

    pub(crate) fn bump_retries(&mut self) {
        self.retries = self.retries.saturating_add(1);
    }

    pub(crate) fn reset_retries(&mut self) {
        self.retries = 0;
    }

    /// Record the terminal outcome. First write wins.
    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }
}
