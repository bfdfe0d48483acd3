//! Shared case-intake contracts for the Safe Line triage core.
//!
//! Value types used across the workspace:
//!
//! - **Caller identity**: normalized phone numbers with a generated
//!   fallback, so a session is never left without an identity
//! - **Case IDs**: the `CR-YYYYMMDD-XXXX` persisted-state contract
//! - **Taxonomy**: the fixed crime-category set and classification
//!   results with confidence handling
//! - **Collected fields**: the structured fields gathered during a
//!   call, with per-field validation
//! - **Enrichment**: best-effort extraction of volunteered details
//!   (incident date, amount lost) from caller speech
//! - **Case records**: the immutable output of a completed intake

pub mod caseid;
pub mod enrich;
pub mod fields;
pub mod identity;
pub mod record;
pub mod taxonomy;

pub use caseid::CaseId;
pub use fields::{FieldKind, FieldValue};
pub use identity::CallerId;
pub use record::CaseRecord;
pub use taxonomy::{Classification, CrimeCategory};
