//! Audit trail for completed intake sessions.
//!
//! One entry per terminal session. Full transcripts are retained only
//! for escalated and failed sessions, where a human will review the
//! call; completed and declined sessions keep counts and timings.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use casefile::CaseId;

use crate::session::CallSession;
use crate::types::{Outcome, Turn};

/// An entry in the intake audit log.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// Session ID
    pub session_id: uuid::Uuid,
    /// Normalized caller identity text
    pub caller: String,
    /// Terminal outcome
    pub outcome: Outcome,
    /// Case ID, for completed sessions
    pub case_id: Option<CaseId>,
    /// Total turns in the conversation
    pub turn_count: usize,
    /// Transcript, retained for escalated and failed sessions
    pub transcript: Option<Vec<Turn>>,
    /// When the call started
    pub started_at: DateTime<Utc>,
    /// When the terminal outcome was reached
    pub ended_at: DateTime<Utc>,
    /// Call duration in ms
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Build an entry from a session that reached `outcome`.
    pub fn from_session(session: &CallSession, outcome: Outcome) -> Self {
        let ended_at = Utc::now();
        let transcript = match outcome {
            Outcome::Escalated | Outcome::Failed => Some(session.turns().to_vec()),
            Outcome::Done(_) | Outcome::Declined => None,
        };
        Self {
            session_id: session.session_id(),
            caller: session.caller().as_str().to_string(),
            case_id: outcome.case_id().cloned(),
            outcome,
            turn_count: session.turns().len(),
            transcript,
            started_at: session.started_at(),
            ended_at,
            duration_ms: (ended_at - session.started_at()).num_milliseconds().max(0) as u64,
        }
    }
}

/// Bounded audit log of terminal sessions, newest first.
pub struct IntakeAudit {
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
    max_entries: usize,
}

impl IntakeAudit {
    /// Create with a retention bound.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Record a session's terminal entry.
    pub async fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.write().await;
        entries.push_front(entry);
        while entries.len() > self.max_entries {
            entries.pop_back();
        }
    }

    /// Get recent entries.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Look up the entry for a session.
    pub async fn get(&self, session_id: uuid::Uuid) -> Option<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().find(|e| e.session_id == session_id).cloned()
    }

    /// Get statistics.
    pub async fn stats(&self) -> AuditStats {
        let entries = self.entries.read().await;

        let total = entries.len();
        let completed = entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Done(_)))
            .count();
        let escalated = entries
            .iter()
            .filter(|e| e.outcome == Outcome::Escalated)
            .count();
        let declined = entries
            .iter()
            .filter(|e| e.outcome == Outcome::Declined)
            .count();
        let failed = entries
            .iter()
            .filter(|e| e.outcome == Outcome::Failed)
            .count();

        let avg_duration_ms = if total > 0 {
            entries.iter().map(|e| e.duration_ms).sum::<u64>() / total as u64
        } else {
            0
        };

        AuditStats {
            total_sessions: total,
            completed,
            escalated,
            declined,
            failed,
            avg_duration_ms,
        }
    }

    /// Get count.
    pub async fn count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

/// Statistics from the intake audit log.
#[derive(Debug, Clone)]
pub struct AuditStats {
    /// Sessions currently retained
    pub total_sessions: usize,
    /// Sessions that produced a case
    pub completed: usize,
    /// Sessions escalated to an operator
    pub escalated: usize,
    /// Sessions where consent was declined
    pub declined: usize,
    /// Sessions that failed mid-flow
    pub failed: usize,
    /// Average call duration
    pub avg_duration_ms: u64,
}
