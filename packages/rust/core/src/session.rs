//! Guided troubleshooting session.
//!
//! [`GuideSession`] is the context object handed to a presentation layer.
//! It owns the retrieval provider, the step runner, and the fallback
//! matcher, and exposes the inbound operations the UI calls. One session
//! serves one agent; `reset` starts over with a new session id.

use std::fmt;

use serde::Serialize;
use stepguide_retrieval::{
    ContentScanner, KeywordRetrieval, KnowledgeBase, PinnedRetrieval, RetrievalProvider,
    SearchOutcome, builtin_catalog, load_catalog_from,
};
use stepguide_shared::{
    AppConfig, Article, FailureReason, NavigationError, ProviderKind, Result, StepGuideError,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::fallback::{
    CrossArticleMatcher, FallbackDecision, FallbackTarget, TokenOverlapMatcher, select_fallback,
};
use crate::runner::{
    CompletionSummary, ContinueOutcome, RunnerPhase, StartOutcome, StepRef, StepRunner,
    StepSnapshot, SwitchOutcome,
};

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 identifying one troubleshooting session (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// GuideSession
// ---------------------------------------------------------------------------

/// Context object tying retrieval, navigation, and fallback policy together.
pub struct GuideSession {
    id: SessionId,
    provider: Box<dyn RetrievalProvider>,
    matcher: Box<dyn CrossArticleMatcher>,
    runner: StepRunner,
    top_n: usize,
}

impl GuideSession {
    pub fn new(
        provider: Box<dyn RetrievalProvider>,
        matcher: Box<dyn CrossArticleMatcher>,
        top_n: usize,
    ) -> Self {
        let id = SessionId::new();
        debug!(session_id = %id, provider = provider.name(), matcher = matcher.name(), "session created");
        Self {
            id,
            provider,
            matcher,
            runner: StepRunner::new(),
            top_n,
        }
    }

    /// Build a session from application config: load the catalog, pick the
    /// retrieval provider, and configure the fallback matcher.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let articles = match &config.catalog.path {
            Some(path) => load_catalog_from(path)?,
            None => builtin_catalog()?,
        };
        let kb = KnowledgeBase::new(articles)?;

        let provider: Box<dyn RetrievalProvider> = match config.retrieval.provider {
            ProviderKind::Keyword => Box::new(KeywordRetrieval::new(kb)),
            ProviderKind::Pinned => Box::new(PinnedRetrieval::new(
                kb,
                config.retrieval.pinned_ids.iter().map(String::as_str),
            )),
        };
        let matcher = Box::new(TokenOverlapMatcher::new(config.fallback.min_overlap));

        Ok(Self::new(provider, matcher, config.retrieval.top_n))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn provider(&self) -> &dyn RetrievalProvider {
        self.provider.as_ref()
    }

    pub fn runner(&self) -> &StepRunner {
        &self.runner
    }

    // -- retrieval ------------------------------------------------------------

    /// Search with the configured result limit.
    pub fn search(&self, query: &str) -> SearchOutcome<'_> {
        self.provider.search(query, self.top_n)
    }

    pub fn search_top(&self, query: &str, top_n: usize) -> SearchOutcome<'_> {
        self.provider.search(query, top_n)
    }

    pub fn get_article(&self, id: &str) -> Option<&Article> {
        self.provider.get_article(id)
    }

    /// Substring browse over the catalog.
    pub fn browse(&self, substring: &str) -> Vec<&Article> {
        self.provider.filter(substring)
    }

    /// Run the page scanner when the toggle is on; its text seeds the first search.
    pub fn seed_query(enabled: bool, scanner: &dyn ContentScanner) -> Result<Option<String>> {
        if !enabled {
            return Ok(None);
        }
        let seed = scanner.scan()?;
        debug!(scanner = scanner.name(), found = seed.is_some(), "seed query scanned");
        Ok(seed)
    }

    // -- navigation -----------------------------------------------------------

    /// Start guiding through `article_id` from its first step.
    #[instrument(skip_all, fields(session_id = %self.id, article_id = article_id))]
    pub fn start(&mut self, article_id: &str) -> Result<StartOutcome> {
        let article = self
            .provider
            .get_article(article_id)
            .ok_or_else(|| StepGuideError::not_found("article", article_id))?;
        Ok(self.runner.start_article(article))
    }

    /// The article currently being walked.
    pub fn active_article(&self) -> Option<&Article> {
        let state = self.runner.state()?;
        self.provider.get_article(state.selected_article_id.as_str())
    }

    pub fn current_step(&self) -> Option<StepSnapshot> {
        let article = self.active_article()?;
        self.runner.current_step(article)
    }

    pub fn phase(&self) -> RunnerPhase {
        self.runner.phase()
    }

    pub fn is_complete(&self) -> bool {
        self.runner.is_complete()
    }

    /// Advance past the current step. With `displayed`, repeated triggers
    /// for a step that is no longer current are ignored.
    pub fn continue_step(&mut self, displayed: Option<&StepRef>) -> Result<ContinueOutcome> {
        let article = active_article(&self.runner, self.provider.as_ref())?;
        let outcome = match displayed {
            Some(step) => self.runner.continue_from(article, step)?,
            None => self.runner.continue_step(article)?,
        };
        Ok(outcome)
    }

    /// Go back one step and return it.
    pub fn back(&mut self) -> Result<Option<StepSnapshot>> {
        self.runner.back()?;
        Ok(self.current_step())
    }

    /// Record a failure on the current step (or the last one, once the path
    /// is complete) and decide where to go next.
    #[instrument(skip_all, fields(session_id = %self.id, reason = %reason))]
    pub fn report_failure(
        &mut self,
        reason: FailureReason,
        note: Option<&str>,
    ) -> Result<FallbackDecision<'_>> {
        let article = active_article(&self.runner, self.provider.as_ref())?;
        let step_id = failed_step_id(&self.runner, article);
        self.runner.record_failure(&step_id, reason, note)?;

        let decision = select_fallback(
            article,
            self.provider.articles(),
            reason,
            note,
            self.matcher.as_ref(),
        );
        info!(step_id = %step_id, kind = decision.kind(), "failure reported");
        Ok(decision)
    }

    /// Switch onto a fallback chosen by [`report_failure`](Self::report_failure),
    /// skipping leading steps already completed in this session.
    #[instrument(skip_all, fields(session_id = %self.id, article_id = %target.article_id, fallback_id = %target.fallback_id))]
    pub fn switch_to_fallback(&mut self, target: &FallbackTarget) -> Result<SwitchOutcome> {
        let article = self
            .provider
            .get_article(target.article_id.as_str())
            .ok_or_else(|| StepGuideError::not_found("article", target.article_id.as_str()))?;
        let completed_texts = self.runner.completed_step_texts();
        Ok(self
            .runner
            .switch_to_fallback(&target.fallback_id, article, &completed_texts)?)
    }

    /// One-shot "skipped N step(s)" notice after a fallback switch.
    pub fn take_skipped_notice(&mut self) -> Option<usize> {
        self.runner.take_skipped_notice()
    }

    pub fn summary(&self) -> Option<CompletionSummary> {
        self.runner.completion_summary()
    }

    /// Discard navigation state and begin a new session id.
    pub fn reset(&mut self) {
        self.runner.reset();
        self.id = SessionId::new();
        info!(session_id = %self.id, "session reset");
    }
}

fn active_article<'a>(
    runner: &StepRunner,
    provider: &'a dyn RetrievalProvider,
) -> std::result::Result<&'a Article, StepGuideError> {
    let state = runner.state().ok_or(NavigationError::NoActiveArticle)?;
    provider
        .get_article(state.selected_article_id.as_str())
        .ok_or_else(|| StepGuideError::not_found("article", state.selected_article_id.as_str()))
}

fn failed_step_id(runner: &StepRunner, article: &Article) -> String {
    if let Some(step) = runner.current_step(article) {
        return step.step_id;
    }
    runner
        .state()
        .and_then(|s| article.steps_for(&s.active_path))
        .and_then(|steps| steps.last())
        .map(|s| s.id.clone())
        .unwrap_or_else(|| article.id.to_string())
}
