//! Caller identity normalization.
//!
//! Canonicalizes raw caller-identification strings into a stable
//! `+<country><10 digits>` form, or generates a fallback identifier
//! when no usable number is present. The session must never be left
//! without an identity, so normalization is total.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Country codes recognized when prefixed to a 10-digit number.
const KNOWN_COUNTRY_CODES: [&str; 4] = ["91", "1", "44", "61"];

/// A normalized caller identity.
///
/// Either a canonical phone number or a generated fallback token.
/// Immutable once assigned to a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerId {
    /// Canonical `+<country><10 digits>` phone identity
    Phone(String),
    /// Generated token used when no valid number was determinable
    Fallback(String),
}

impl CallerId {
    /// Normalize a raw caller-identification string.
    ///
    /// Extracts the digits and interprets them as a 10-digit national
    /// number, optionally prefixed with a recognized country code.
    /// `default_country` is used when the input carries no code of its
    /// own. Malformed input degrades to a fresh fallback identifier
    /// rather than failing.
    pub fn normalize(raw: &str, default_country: &str) -> CallerId {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() == 10 {
            return CallerId::Phone(format!("+{}{}", default_country, digits));
        }

        // Longer runs: try to peel a recognized country code off the front.
        if digits.len() > 10 {
            let code_len = digits.len() - 10;
            let (code, national) = digits.split_at(code_len);
            if KNOWN_COUNTRY_CODES.contains(&code) {
                return CallerId::Phone(format!("+{}{}", code, national));
            }
        }

        let token = format!("caller-{}", uuid::Uuid::new_v4().simple());
        debug!(raw_len = raw.len(), fallback = %token, "No valid number in caller id, using fallback");
        CallerId::Fallback(token)
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            CallerId::Phone(s) | CallerId::Fallback(s) => s,
        }
    }

    /// Whether this identity is a generated fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, CallerId::Fallback(_))
    }

    /// The dialable number, if this identity is a real phone.
    pub fn phone(&self) -> Option<&str> {
        match self {
            CallerId::Phone(s) => Some(s),
            CallerId::Fallback(_) => None,
        }
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
