//! Structured fields collected during a call.
//!
//! The collection order is fixed; each field has a prompt and a basic
//! shape validator. A field that repeatedly fails validation is
//! recorded as `Unknown` so the flow never deadlocks on one answer.

use serde::{Deserialize, Serialize};

/// A field collected by the conversation flow, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Caller's name
    Name,
    /// Contact number for follow-up
    Contact,
    /// Free-form description of the incident
    IncidentDescription,
}

impl FieldKind {
    /// First field in the collection order.
    pub fn first() -> FieldKind {
        FieldKind::Name
    }

    /// The field collected after this one, if any.
    pub fn next(&self) -> Option<FieldKind> {
        match self {
            FieldKind::Name => Some(FieldKind::Contact),
            FieldKind::Contact => Some(FieldKind::IncidentDescription),
            FieldKind::IncidentDescription => None,
        }
    }

    /// The agent's prompt for this field.
    pub fn prompt(&self) -> &'static str {
        match self {
            FieldKind::Name => "May I have your full name, please?",
            FieldKind::Contact => {
                "What is the best contact number to reach you on? Please say the ten digits."
            }
            FieldKind::IncidentDescription => {
                "Please describe what happened, in as much detail as you can."
            }
        }
    }

    /// The agent's re-prompt after a failed validation.
    pub fn reprompt(&self) -> &'static str {
        match self {
            FieldKind::Name => "Sorry, I didn't catch your name. Could you repeat it?",
            FieldKind::Contact => {
                "I couldn't make out a ten-digit number. Could you say your contact number again, digit by digit?"
            }
            FieldKind::IncidentDescription => {
                "I didn't catch that. Could you describe the incident again?"
            }
        }
    }

    /// Validate and normalize a caller answer for this field.
    ///
    /// Returns the value to record, or `None` when the answer does not
    /// match the expected shape.
    pub fn validate(&self, answer: &str) -> Option<String> {
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            return None;
        }
        match self {
            FieldKind::Name | FieldKind::IncidentDescription => Some(trimmed.to_string()),
            FieldKind::Contact => extract_contact_digits(trimmed),
        }
    }
}

/// Pull a 10-digit contact number out of a spoken answer.
fn extract_contact_digits(answer: &str) -> Option<String> {
    let mut run = String::new();
    let mut best: Option<String> = None;

    for c in answer.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else if !c.is_whitespace() && c != '-' && c != '(' && c != ')' && c != '.' {
            // Separator that ends the current digit run.
            if run.len() == 10 {
                best = Some(run.clone());
            }
            run.clear();
        }
    }
    if run.len() == 10 {
        best = Some(run);
    }
    best
}

/// A collected field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Caller-provided, validated value
    Provided(String),
    /// Recorded after the bounded retry count was exhausted
    Unknown,
}

impl FieldValue {
    /// The value as text, with `"unknown"` for the fallback.
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Provided(s) => s,
            FieldValue::Unknown => "unknown",
        }
    }

    /// Whether the caller actually provided this value.
    pub fn is_provided(&self) -> bool {
        matches!(self, FieldValue::Provided(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_order() {
        let mut order = vec![FieldKind::first()];
        while let Some(next) = order.last().unwrap().next() {
            order.push(next);
        }
        assert_eq!(
            order,
            vec![FieldKind::Name, FieldKind::Contact, FieldKind::IncidentDescription]
        );
    }

    #[test]
    fn test_name_validation() {
        assert_eq!(FieldKind::Name.validate("  Asha Rao "), Some("Asha Rao".to_string()));
        assert_eq!(FieldKind::Name.validate("   "), None);
    }

    #[test]
    fn test_contact_validation() {
        assert_eq!(
            FieldKind::Contact.validate("9876543210"),
            Some("9876543210".to_string())
        );
        assert_eq!(
            FieldKind::Contact.validate("it's 98765 43210"),
            Some("9876543210".to_string())
        );
        assert_eq!(
            FieldKind::Contact.validate("call me on (987) 654-3210 please"),
            Some("9876543210".to_string())
        );
        assert_eq!(FieldKind::Contact.validate("12345"), None);
        assert_eq!(FieldKind::Contact.validate("no number"), None);
    }

    #[test]
    fn test_description_validation() {
        assert!(FieldKind::IncidentDescription
            .validate("received a phishing email")
            .is_some());
        assert!(FieldKind::IncidentDescription.validate("").is_none());
    }

    #[test]
    fn test_unknown_value() {
        assert_eq!(FieldValue::Unknown.as_str(), "unknown");
        assert!(!FieldValue::Unknown.is_provided());
        assert!(FieldValue::Provided("x".into()).is_provided());
    }
}
