//! Per-day case number allocation.
//!
//! The generator is the only state shared across concurrent sessions.
//! Each date maps to a counter; `next` increments under the map's
//! shard lock, so two sessions finalizing at the same instant can
//! never draw the same number. Sequence numbers are never reused,
//! even when a later assembly step fails.

use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::debug;

use casefile::caseid::MAX_SEQUENCE;
use casefile::CaseId;

use crate::types::{Result, TriageError};

/// Allocates `CR-YYYYMMDD-XXXX` case ids, restarting the sequence at
/// 0001 each day.
#[derive(Debug, Default)]
pub struct CaseIdGenerator {
    counters: DashMap<NaiveDate, u16>,
}

impl CaseIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next case id for a date.
    ///
    /// Errors once the day's sequence would pass 9999; the fixed-width
    /// format cannot represent more, and silently rolling over would
    /// collide with earlier ids.
    pub fn next(&self, date: NaiveDate) -> Result<CaseId> {
        let mut entry = self.counters.entry(date).or_insert(0);
        if *entry >= MAX_SEQUENCE {
            return Err(TriageError::Invariant(format!(
                "Case sequence for {} exhausted ({} ids issued)",
                date, MAX_SEQUENCE
            )));
        }
        *entry += 1;
        let sequence = *entry;
        drop(entry);

        debug!(date = %date, sequence, "Allocated case sequence");
        Ok(CaseId::new(date, sequence)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let gen = CaseIdGenerator::new();
        let id = gen.next(date()).unwrap();
        assert_eq!(id.to_string(), "CR-20250115-0001");
        let id = gen.next(date()).unwrap();
        assert_eq!(id.to_string(), "CR-20250115-0002");
    }

    #[test]
    fn test_sequence_restarts_per_day() {
        let gen = CaseIdGenerator::new();
        gen.next(date()).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        let id = gen.next(next_day).unwrap();
        assert_eq!(id.to_string(), "CR-20250116-0001");
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let gen = CaseIdGenerator::new();
        gen.counters.insert(date(), MAX_SEQUENCE);
        let err = gen.next(date()).unwrap_err();
        assert!(matches!(err, TriageError::Invariant(_)));
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct() {
        let gen = Arc::new(CaseIdGenerator::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let gen = Arc::clone(&gen);
            handles.push(tokio::spawn(async move { gen.next(date()).unwrap() }));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap();
            assert!(seen.insert(id.to_string()), "duplicate case id issued");
        }
        assert_eq!(seen.len(), 50);
    }
}
