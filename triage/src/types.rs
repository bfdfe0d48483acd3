//! Core types for the triage engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casefile::caseid::CaseIdError;
use casefile::CaseId;

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person reporting
    Caller,
    /// The conversational agent
    Agent,
}

/// One turn in the conversation. Turns are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub speaker: Speaker,
    /// What was said
    pub text: String,
    /// When it was said
    pub at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped now.
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Terminal outcome of a session. Exactly one is reached per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Case record produced and handed off
    Done(CaseId),
    /// Escalated to a human operator; no case produced
    Escalated,
    /// Caller declined consent; valid non-error terminal
    Declined,
    /// Mid-flow failure or disconnect; surfaced for manual review
    Failed,
}

impl Outcome {
    /// The case id, when the session produced one.
    pub fn case_id(&self) -> Option<&CaseId> {
        match self {
            Outcome::Done(id) => Some(id),
            _ => None,
        }
    }
}

/// Error types for the triage engine.
///
/// Input-quality problems (empty fields, unparseable numbers) never
/// appear here: they are recovered in-flow via fallbacks and bounded
/// re-prompting. External-service failures are likewise handled via
/// fallbacks and only logged. What remains is misuse and invariant
/// violations.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// Turn delivered to a session that already reached a terminal
    /// state
    #[error("Session {0} already reached a terminal state")]
    SessionClosed(uuid::Uuid),

    /// Case id construction or sequence error
    #[error("Case id error: {0}")]
    CaseId(#[from] CaseIdError),

    /// Programming-invariant violation; fatal to the current
    /// case-creation attempt and surfaced for manual intervention
    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, TriageError>;
