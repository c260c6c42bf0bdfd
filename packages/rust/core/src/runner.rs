//! Step runner: navigation state for one guided troubleshooting session.
//!
//! States:
//! - `Idle` — no article selected (initial, and after [`StepRunner::reset`])
//! - `InSteps` — walking the active path
//! - `Complete` — the current index has reached the end of the active path
//!
//! Completed step ids only ever grow within a session; navigating back never
//! retracts them. Failure history is append-only.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use stepguide_shared::{Article, ArticleId, FailureReason, NavigationError, PathId, Step};
use tracing::{debug, info, instrument, warn};

// ---------------------------------------------------------------------------
// State records
// ---------------------------------------------------------------------------

/// Coarse runner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerPhase {
    Idle,
    InSteps,
    Complete,
}

/// One entry per path started in a session (main first, then each fallback).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAttempt {
    pub article_id: ArticleId,
    pub path: PathId,
    pub started_at: DateTime<Utc>,
}

/// A step qualified by its article. Step ids are only unique within one
/// article, and a cross-article fallback puts two articles in one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRef {
    pub article_id: ArticleId,
    pub step_id: String,
}

impl StepRef {
    pub fn new(article_id: impl Into<ArticleId>, step_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            step_id: step_id.into(),
        }
    }
}

impl std::fmt::Display for StepRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.article_id, self.step_id)
    }
}

/// A reported step failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub article_id: ArticleId,
    pub step_id: String,
    pub reason: FailureReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Mutable navigation state, created by [`StepRunner::start_article`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerState {
    pub selected_article_id: ArticleId,
    pub active_path: PathId,
    /// Always within `0..=active_len`; equal to `active_len` means complete.
    pub current_step_index: usize,
    /// Step count of the active path.
    pub active_len: usize,
    /// Distinct completed steps in completion order.
    pub completed_steps: IndexSet<StepRef>,
    /// Texts of completed steps, used to skip repeats on a fallback path.
    #[serde(skip)]
    completed_step_texts: IndexSet<String>,
    pub attempted_paths: Vec<PathAttempt>,
    pub failure_history: Vec<FailureRecord>,
    /// Steps auto-skipped by the last fallback switch, until taken.
    pub skipped_steps_count: usize,
}

impl RunnerState {
    fn new(article: &Article) -> Self {
        Self {
            selected_article_id: article.id.clone(),
            active_path: PathId::Main,
            current_step_index: 0,
            active_len: article.steps.len(),
            completed_steps: IndexSet::new(),
            completed_step_texts: IndexSet::new(),
            attempted_paths: vec![PathAttempt {
                article_id: article.id.clone(),
                path: PathId::Main,
                started_at: Utc::now(),
            }],
            failure_history: Vec::new(),
            skipped_steps_count: 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.current_step_index >= self.active_len
    }

    fn mark_completed(&mut self, step: &Step) {
        self.completed_steps
            .insert(StepRef::new(self.selected_article_id.clone(), step.id.as_str()));
        self.completed_step_texts.insert(step.text.clone());
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Render-ready view of the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSnapshot {
    pub article_id: ArticleId,
    pub step_id: String,
    /// 1-based position on the active path.
    pub step_number: usize,
    pub total_steps: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub say_to_customer: Option<String>,
    pub is_first: bool,
    pub is_last: bool,
    pub path: PathId,
}

impl StepSnapshot {
    fn at(article_id: &ArticleId, steps: &[Step], index: usize, path: &PathId) -> Option<Self> {
        let step = steps.get(index)?;
        Some(Self {
            article_id: article_id.clone(),
            step_id: step.id.clone(),
            step_number: index + 1,
            total_steps: steps.len(),
            text: step.text.clone(),
            expected_result: step.expected_result.clone(),
            say_to_customer: step.say_to_customer.clone(),
            is_first: index == 0,
            is_last: index + 1 == steps.len(),
            path: path.clone(),
        })
    }

    /// Identity of the displayed step, for [`StepRunner::continue_from`].
    pub fn step_ref(&self) -> StepRef {
        StepRef::new(self.article_id.clone(), self.step_id.as_str())
    }
}

/// Result of [`StepRunner::start_article`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub total_steps: usize,
    /// `None` when the article has no steps (immediately complete).
    pub first_step: Option<StepSnapshot>,
}

/// Result of a continue request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueOutcome {
    /// The active path has no steps left.
    pub completed: bool,
    /// The index moved forward.
    pub advanced: bool,
    /// The request referred to a step that is no longer current.
    pub stale: bool,
    pub next_step: Option<StepSnapshot>,
}

/// Result of [`StepRunner::switch_to_fallback`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchOutcome {
    pub article_id: ArticleId,
    pub path: PathId,
    /// Leading fallback steps skipped because they were already done.
    pub skipped: usize,
    pub completed: bool,
    pub current_step: Option<StepSnapshot>,
}

/// Snapshot of what happened in a session so far.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub article_id: ArticleId,
    pub active_path: PathId,
    pub is_complete: bool,
    pub completed_steps: Vec<StepRef>,
    pub failure_history: Vec<FailureRecord>,
    pub attempted_paths: Vec<PathAttempt>,
}

impl CompletionSummary {
    /// Bare step ids in completion order. Only unambiguous when the session
    /// stayed on one article.
    pub fn completed_step_ids(&self) -> Vec<&str> {
        self.completed_steps.iter().map(|s| s.step_id.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

/// Navigation state machine for a single active article/path.
///
/// Every operation that reads steps takes the article it was started with
/// (or, after a cross-article fallback, the article switched to); passing a
/// different one is reported as [`NavigationError::ArticleMismatch`].
#[derive(Debug, Default)]
pub struct StepRunner {
    state: Option<RunnerState>,
}

impl StepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&RunnerState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> RunnerPhase {
        match &self.state {
            None => RunnerPhase::Idle,
            Some(s) if s.is_complete() => RunnerPhase::Complete,
            Some(_) => RunnerPhase::InSteps,
        }
    }

    /// Begin a fresh session on `article`, discarding any prior state.
    #[instrument(skip_all, fields(article_id = %article.id))]
    pub fn start_article(&mut self, article: &Article) -> StartOutcome {
        let state = RunnerState::new(article);
        let outcome = StartOutcome {
            total_steps: state.active_len,
            first_step: StepSnapshot::at(&article.id, &article.steps, 0, &PathId::Main),
        };
        self.state = Some(state);

        info!(total_steps = outcome.total_steps, "article started");
        outcome
    }

    /// The step at the current index, or `None` when idle, complete, or
    /// given a different article.
    pub fn current_step(&self, article: &Article) -> Option<StepSnapshot> {
        let (state, steps) = self.active(article).ok()?;
        StepSnapshot::at(&article.id, steps, state.current_step_index, &state.active_path)
    }

    /// Mark the current step completed and move to the next one.
    ///
    /// Past the end this is a no-op reporting `completed`.
    pub fn continue_step(&mut self, article: &Article) -> Result<ContinueOutcome, NavigationError> {
        let steps = self.active(article)?.1;
        let state = self.state_mut()?;

        let Some(step) = steps.get(state.current_step_index) else {
            debug!("continue past end ignored");
            return Ok(ContinueOutcome {
                completed: true,
                advanced: false,
                stale: false,
                next_step: None,
            });
        };

        state.mark_completed(step);
        state.current_step_index += 1;

        let completed = state.is_complete();
        let next_step =
            StepSnapshot::at(&article.id, steps, state.current_step_index, &state.active_path);
        debug!(
            step_id = %step.id,
            index = state.current_step_index,
            completed,
            "step completed"
        );

        Ok(ContinueOutcome {
            completed,
            advanced: true,
            stale: false,
            next_step,
        })
    }

    /// Like [`continue_step`](Self::continue_step), but only if `displayed`
    /// is still the current step. A repeated trigger for a step that was
    /// already processed, or one shown before a switch to another article,
    /// leaves the state untouched.
    pub fn continue_from(
        &mut self,
        article: &Article,
        displayed: &StepRef,
    ) -> Result<ContinueOutcome, NavigationError> {
        self.active(article)?;
        let current = self.current_step(article);
        if current.as_ref().is_some_and(|s| s.step_ref() == *displayed) {
            return self.continue_step(article);
        }

        warn!(displayed = %displayed, "ignoring continue for a step that is no longer current");
        Ok(ContinueOutcome {
            completed: self.is_complete(),
            advanced: false,
            stale: true,
            next_step: current,
        })
    }

    /// Step back one position. Completion history is kept.
    ///
    /// Returns the new 0-based index.
    pub fn back(&mut self) -> Result<usize, NavigationError> {
        let state = self.state_mut()?;
        if state.current_step_index == 0 {
            return Err(NavigationError::AlreadyAtFirstStep);
        }
        state.current_step_index -= 1;
        debug!(index = state.current_step_index, "stepped back");
        Ok(state.current_step_index)
    }

    /// Append a failure record. Navigation position is unchanged.
    pub fn record_failure(
        &mut self,
        step_id: &str,
        reason: FailureReason,
        note: Option<&str>,
    ) -> Result<&FailureRecord, NavigationError> {
        let state = self.state_mut()?;
        let note = note.filter(|n| !n.trim().is_empty()).map(String::from);

        state.failure_history.push(FailureRecord {
            article_id: state.selected_article_id.clone(),
            step_id: step_id.to_string(),
            reason,
            note,
            timestamp: Utc::now(),
        });
        debug!(step_id, %reason, failures = state.failure_history.len(), "failure recorded");

        state
            .failure_history
            .last()
            .ok_or(NavigationError::NoActiveArticle)
    }

    /// Switch the session onto fallback `fallback_id` of `article`.
    ///
    /// `article` may differ from the current one (cross-article fallback);
    /// completed ids, failures, and attempts carry over. The longest leading
    /// run of fallback steps whose text is in `completed_texts` is skipped and
    /// marked completed; skipping stops at the first new step.
    #[instrument(skip_all, fields(article_id = %article.id, fallback_id = fallback_id))]
    pub fn switch_to_fallback(
        &mut self,
        fallback_id: &str,
        article: &Article,
        completed_texts: &[String],
    ) -> Result<SwitchOutcome, NavigationError> {
        let fallback = article
            .fallback(fallback_id)
            .ok_or_else(|| NavigationError::UnknownFallback {
                article_id: article.id.to_string(),
                fallback_id: fallback_id.to_string(),
            })?;
        let state = self.state_mut()?;

        let path = PathId::Fallback(fallback.id.clone());
        state.selected_article_id = article.id.clone();
        state.active_path = path.clone();
        state.current_step_index = 0;
        state.active_len = fallback.steps.len();
        state.attempted_paths.push(PathAttempt {
            article_id: article.id.clone(),
            path: path.clone(),
            started_at: Utc::now(),
        });

        let mut skipped = 0;
        for step in &fallback.steps {
            if !completed_texts.iter().any(|t| *t == step.text) {
                break;
            }
            state.mark_completed(step);
            state.current_step_index += 1;
            skipped += 1;
        }
        state.skipped_steps_count = skipped;

        let current_step =
            StepSnapshot::at(&article.id, &fallback.steps, state.current_step_index, &path);
        let completed = state.is_complete();
        info!(skipped, completed, "switched to fallback path");

        Ok(SwitchOutcome {
            article_id: article.id.clone(),
            path,
            skipped,
            completed,
            current_step,
        })
    }

    /// Return and clear the skipped-step count from the last fallback switch,
    /// so a "skipped N step(s)" notice is shown once.
    pub fn take_skipped_notice(&mut self) -> Option<usize> {
        let state = self.state.as_mut()?;
        match std::mem::take(&mut state.skipped_steps_count) {
            0 => None,
            n => Some(n),
        }
    }

    /// Texts of every step completed so far, in completion order.
    pub fn completed_step_texts(&self) -> Vec<String> {
        self.state
            .as_ref()
            .map(|s| s.completed_step_texts.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Partial or final summary; `None` when idle.
    pub fn completion_summary(&self) -> Option<CompletionSummary> {
        let state = self.state.as_ref()?;
        Some(CompletionSummary {
            article_id: state.selected_article_id.clone(),
            active_path: state.active_path.clone(),
            is_complete: state.is_complete(),
            completed_steps: state.completed_steps.iter().cloned().collect(),
            failure_history: state.failure_history.clone(),
            attempted_paths: state.attempted_paths.clone(),
        })
    }

    /// True once the index has reached the end of the active path.
    pub fn is_complete(&self) -> bool {
        self.state.as_ref().is_some_and(RunnerState::is_complete)
    }

    /// Drop all session state and return to `Idle`.
    pub fn reset(&mut self) {
        if let Some(state) = self.state.take() {
            info!(article_id = %state.selected_article_id, "runner reset");
        }
    }

    // -- helpers ------------------------------------------------------------

    fn state_mut(&mut self) -> Result<&mut RunnerState, NavigationError> {
        self.state.as_mut().ok_or(NavigationError::NoActiveArticle)
    }

    fn active<'a>(
        &self,
        article: &'a Article,
    ) -> Result<(&RunnerState, &'a [Step]), NavigationError> {
        let state = self.state.as_ref().ok_or(NavigationError::NoActiveArticle)?;
        if state.selected_article_id != article.id {
            return Err(NavigationError::ArticleMismatch {
                expected: state.selected_article_id.to_string(),
                actual: article.id.to_string(),
            });
        }
        let steps = article
            .steps_for(&state.active_path)
            .ok_or_else(|| NavigationError::UnknownFallback {
                article_id: article.id.to_string(),
                fallback_id: state.active_path.to_string(),
            })?;
        Ok((state, steps))
    }
}
