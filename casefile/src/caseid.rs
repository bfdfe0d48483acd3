//! Case identifiers.
//!
//! The `CR-YYYYMMDD-XXXX` textual format is a persisted-state
//! contract: external systems parse it, so it stays fixed width.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest sequence number representable in the fixed-width format.
pub const MAX_SEQUENCE: u16 = 9999;

/// Error parsing or constructing a case ID.
#[derive(Debug, thiserror::Error)]
pub enum CaseIdError {
    /// Input does not match `CR-YYYYMMDD-XXXX`
    #[error("Malformed case id: {0}")]
    Malformed(String),

    /// Date component is not a real calendar date
    #[error("Invalid date in case id: {0}")]
    InvalidDate(String),

    /// Sequence component out of the 1..=9999 range
    #[error("Case sequence out of range: {0}")]
    SequenceOutOfRange(u32),
}

/// A unique, human-readable case identifier with embedded date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseId {
    date: NaiveDate,
    sequence: u16,
}

impl CaseId {
    /// Construct from a creation date and per-day sequence number.
    pub fn new(date: NaiveDate, sequence: u16) -> Result<Self, CaseIdError> {
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(CaseIdError::SequenceOutOfRange(sequence as u32));
        }
        Ok(Self { date, sequence })
    }

    /// The creation date embedded in the id.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The per-day sequence number.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CR-{}-{:04}", self.date.format("%Y%m%d"), self.sequence)
    }
}

impl FromStr for CaseId {
    type Err = CaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("CR-")
            .ok_or_else(|| CaseIdError::Malformed(s.to_string()))?;

        let (date_part, seq_part) = rest
            .split_once('-')
            .ok_or_else(|| CaseIdError::Malformed(s.to_string()))?;

        if date_part.len() != 8 || seq_part.len() != 4 {
            return Err(CaseIdError::Malformed(s.to_string()));
        }

        let date = NaiveDate::parse_from_str(date_part, "%Y%m%d")
            .map_err(|_| CaseIdError::InvalidDate(date_part.to_string()))?;

        let sequence: u16 = seq_part
            .parse()
            .map_err(|_| CaseIdError::Malformed(s.to_string()))?;

        CaseId::new(date, sequence)
    }
}

impl TryFrom<String> for CaseId {
    type Error = CaseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> String {
        id.to_string()
    }
}
