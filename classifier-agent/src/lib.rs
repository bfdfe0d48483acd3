//! LLM-backed crime classification for the Safe Line triage core.
//!
//! The classification call itself is an external, non-deterministic
//! capability; this crate keeps it behind the [`LlmBackend`] trait so
//! the triage state machine stays deterministic and testable against
//! [`MockBackend`]. The [`CrimeClassifier`] service owns prompt
//! construction, response parsing, and confidence thresholding.
//!
//! Failure (timeout, malformed response, backend down) is a normal
//! outcome here, typed as [`ClassifyError`] - the triage layer maps it
//! to the `Unclassified` fallback rather than failing the session.

pub mod backend;
pub mod classifier;
pub mod prompt;

pub use backend::{CompletionRequest, CompletionResponse, LlmBackend, LlmError, MockBackend, OpenAiBackend};
pub use classifier::{ClassifyError, CrimeClassifier};
