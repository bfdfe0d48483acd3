//! Call-triage and case-intake engine for the Safe Line cybercrime
//! helpline.
//!
//! Takes an incoming call's transcript turns, screens every caller
//! turn for emergency language, and either escalates to a human
//! operator or walks the caller through structured collection to a
//! trackable case record:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      TriageEngine                          │
//! │                                                            │
//! │  normalize ─▶ session ─▶ emergency ─▶ state ─▶ assemble    │
//! │   identity              screen       machine     case      │
//! │                             │           │          │       │
//! │                        escalation   classifier  sink/SMS   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Ordering**: turns within a session are processed strictly in
//!   arrival order; sessions are independent
//! - **Shared state**: the per-day case-ID sequence counter is the
//!   only synchronized resource shared across sessions
//! - **Failure posture**: classifier and collaborator failures are
//!   recoverable fallbacks; invariant violations are surfaced loudly

pub mod assembler;
pub mod audit;
pub mod caseid_gen;
pub mod config;
pub mod emergency;
pub mod engine;
pub mod handoff;
pub mod machine;
pub mod session;
pub mod types;

pub use config::TriageConfig;
pub use engine::{TriageEngine, TurnReply};
pub use session::CallSession;
pub use types::{Outcome, Speaker, TriageError, Turn};
