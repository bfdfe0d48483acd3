//! The conversation state machine.
//!
//! `transition` is a pure function from (stage, event, context) to the
//! next stage plus a list of effects. It performs no I/O and holds no
//! state, so every flow rule is unit-testable without an engine, a
//! classifier, or a clock. The engine owns effect execution.

use serde::{Deserialize, Serialize};

use casefile::{CaseId, Classification, FieldKind};

/// Conversation stage. `Done`, `Escalated`, `Declined` and `Failed`
/// are terminal; a session reaches exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Call connected, greeting not yet delivered
    Greeting,
    /// Waiting for the caller's consent to record details
    Consent,
    /// Collecting one structured field
    Collecting(FieldKind),
    /// Narrative handed to the crime classifier
    Classifying,
    /// Assembling the case record
    Finalizing,
    /// Case registered and handed off
    Done,
    /// Routed to a human operator
    Escalated,
    /// Caller declined consent
    Declined,
    /// Mid-flow failure or disconnect
    Failed,
}

impl Stage {
    /// Whether this stage accepts no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::Done | Stage::Escalated | Stage::Declined | Stage::Failed
        )
    }
}

/// An input to the state machine.
///
/// Caller turns arrive pre-screened: the engine runs the emergency
/// screen first and feeds `EmergencyDetected` instead of `CallerSaid`
/// when it fires.
#[derive(Debug, Clone)]
pub enum Event<'a> {
    /// The call channel is open; deliver the greeting
    CallConnected,
    /// A (non-urgent) caller turn
    CallerSaid(&'a str),
    /// The emergency screen fired on the latest turn
    EmergencyDetected,
    /// Classifier finished (or fell back to Unclassified)
    ClassificationReady(Classification),
    /// Case record built and numbered
    CaseAssembled(CaseId),
    /// Case assembly failed
    AssemblyFailed,
    /// Caller hung up
    Disconnected,
}

/// A side effect requested by a transition, executed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Speak a line to the caller
    Say(String),
    /// Record a validated field value on the session
    RecordField(FieldKind, String),
    /// Record a field as unknown after retries ran out
    MarkUnknown(FieldKind),
    /// Run the crime classifier over the narrative
    RunClassifier,
    /// Assemble and number the case record
    AssembleCase,
    /// Route an escalation event to the human operator queue
    Escalate,
    /// Send the confirmation SMS with the prefill link
    SendCaseSms,
    /// Flag the session for manual review
    SurfaceForReview,
}

/// Per-transition context: the session's current re-prompt count and
/// the configured bound.
#[derive(Debug, Clone, Copy)]
pub struct TransitionCtx {
    pub retries: u8,
    pub max_retries: u8,
}

/// Result of one transition.
#[derive(Debug, Clone)]
pub struct Step {
    pub next: Stage,
    pub effects: Vec<Effect>,
}

impl Step {
    fn stay(stage: Stage) -> Self {
        Self {
            next: stage,
            effects: vec![],
        }
    }

    fn to(next: Stage, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

/// Apply one event to the current stage.
///
/// Terminal stages absorb every event. An emergency or disconnect
/// preempts from any non-terminal stage. Everything else follows the
/// stage-by-stage rules below.
pub fn transition(stage: Stage, event: Event<'_>, ctx: TransitionCtx) -> Step {
    if stage.is_terminal() {
        return Step::stay(stage);
    }

    match event {
        Event::EmergencyDetected => Step::to(
            Stage::Escalated,
            vec![Effect::Say(prompts::escalation().to_string()), Effect::Escalate],
        ),
        Event::Disconnected => Step::to(Stage::Failed, vec![Effect::SurfaceForReview]),

        Event::CallConnected => match stage {
            Stage::Greeting => Step::to(
                Stage::Consent,
                vec![Effect::Say(prompts::greeting().to_string())],
            ),
            _ => Step::stay(stage),
        },

        Event::CallerSaid(text) => match stage {
            Stage::Consent => on_consent_answer(text, ctx),
            Stage::Collecting(kind) => on_field_answer(kind, text, ctx),
            // The caller kept talking while the classifier or
            // assembler runs; the turn is kept in the transcript but
            // drives nothing.
            _ => Step::stay(stage),
        },

        Event::ClassificationReady(_) => match stage {
            Stage::Classifying => Step::to(Stage::Finalizing, vec![Effect::AssembleCase]),
            _ => Step::stay(stage),
        },

        Event::CaseAssembled(case_id) => match stage {
            Stage::Finalizing => Step::to(
                Stage::Done,
                vec![Effect::Say(prompts::confirmation(&case_id)), Effect::SendCaseSms],
            ),
            _ => Step::stay(stage),
        },

        Event::AssemblyFailed => match stage {
            Stage::Finalizing => Step::to(
                Stage::Failed,
                vec![
                    Effect::Say(prompts::assembly_failure().to_string()),
                    Effect::SurfaceForReview,
                ],
            ),
            _ => Step::stay(stage),
        },
    }
}

/// Consent is never assumed: an explicit decline wins over anything
/// else in the answer, an explicit affirmation proceeds, and anything
/// ambiguous re-prompts until the retry bound resolves it to declined.
fn on_consent_answer(text: &str, ctx: TransitionCtx) -> Step {
    match parse_consent(text) {
        ConsentAnswer::Declined => Step::to(
            Stage::Declined,
            vec![Effect::Say(prompts::decline_ack().to_string())],
        ),
        ConsentAnswer::Given => Step::to(
            Stage::Collecting(FieldKind::first()),
            vec![Effect::Say(FieldKind::first().prompt().to_string())],
        ),
        ConsentAnswer::Ambiguous => {
            if ctx.retries + 1 >= ctx.max_retries {
                Step::to(
                    Stage::Declined,
                    vec![Effect::Say(prompts::decline_ack().to_string())],
                )
            } else {
                Step::to(
                    Stage::Consent,
                    vec![Effect::Say(prompts::consent_reprompt().to_string())],
                )
            }
        }
    }
}

fn on_field_answer(kind: FieldKind, text: &str, ctx: TransitionCtx) -> Step {
    match kind.validate(text) {
        Some(value) => advance_from(kind, vec![Effect::RecordField(kind, value)]),
        None => {
            if ctx.retries + 1 >= ctx.max_retries {
                // Record `unknown` and move on rather than deadlock on
                // one answer.
                advance_from(kind, vec![Effect::MarkUnknown(kind)])
            } else {
                Step::to(
                    Stage::Collecting(kind),
                    vec![Effect::Say(kind.reprompt().to_string())],
                )
            }
        }
    }
}

fn advance_from(kind: FieldKind, mut effects: Vec<Effect>) -> Step {
    match kind.next() {
        Some(next) => {
            effects.push(Effect::Say(next.prompt().to_string()));
            Step::to(Stage::Collecting(next), effects)
        }
        None => {
            effects.push(Effect::Say(prompts::hold_for_registration().to_string()));
            effects.push(Effect::RunClassifier);
            Step::to(Stage::Classifying, effects)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsentAnswer {
    Given,
    Declined,
    Ambiguous,
}

const DECLINE_WORDS: &[&str] = &["no", "nope", "nah", "dont", "decline"];
const DECLINE_PHRASES: &[&str] = &["do not", "not now", "rather not", "don't"];
const AFFIRM_WORDS: &[&str] = &["yes", "yeah", "yep", "ok", "okay", "sure", "fine", "haan"];
const AFFIRM_PHRASES: &[&str] = &["go ahead", "of course", "please do"];

fn parse_consent(text: &str) -> ConsentAnswer {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    let declined = DECLINE_WORDS.iter().any(|w| words.contains(w))
        || DECLINE_PHRASES.iter().any(|p| lowered.contains(p));
    if declined {
        return ConsentAnswer::Declined;
    }

    let affirmed = AFFIRM_WORDS.iter().any(|w| words.contains(w))
        || AFFIRM_PHRASES.iter().any(|p| lowered.contains(p));
    if affirmed {
        ConsentAnswer::Given
    } else {
        ConsentAnswer::Ambiguous
    }
}

/// Everything the agent says, in one place.
pub mod prompts {
    use casefile::CaseId;

    pub fn greeting() -> &'static str {
        "Hello, you have reached Safe Line, the cybercrime helpline. \
         I can register a case for you. May I take a few details? \
         Please say yes or no."
    }

    pub fn consent_reprompt() -> &'static str {
        "I need your permission before I record any details. \
         Shall I go ahead - yes or no?"
    }

    pub fn decline_ack() -> &'static str {
        "That is alright. No details have been recorded. \
         You can call back any time. Goodbye."
    }

    pub fn escalation() -> &'static str {
        "This sounds like it may still be in progress. \
         I am connecting you to a human operator right away. \
         Please stay on the line."
    }

    pub fn hold_for_registration() -> &'static str {
        "Thank you. Please hold on for a moment while I register your case."
    }

    pub fn confirmation(case_id: &CaseId) -> String {
        format!(
            "Your case has been registered with number {}. \
             We have sent you an SMS with a link to review the details. \
             Goodbye, and stay safe.",
            case_id
        )
    }

    pub fn assembly_failure() -> &'static str {
        "I am sorry, something went wrong while registering your case. \
         Our team will review this call and follow up with you. Goodbye."
    }
}
