//! Step navigation and fallback logic for StepGuide.
//!
//! This crate holds the step runner state machine, the fallback selection
//! policy, and the [`GuideSession`] context object that presentation layers
//! drive.

pub mod fallback;
pub mod runner;
pub mod session;

pub use fallback::{
    CrossArticleMatcher, FallbackDecision, FallbackTarget, TokenOverlapMatcher, select_fallback,
};
pub use runner::{
    CompletionSummary, ContinueOutcome, FailureRecord, PathAttempt, RunnerPhase, RunnerState,
    StartOutcome, StepRef, StepRunner, StepSnapshot, SwitchOutcome,
};
pub use session::{GuideSession, SessionId};
