//! TUI screen definitions.
//!
//! Each screen corresponds to a tab in the TUI and encapsulates its
//! own state and rendering logic. Screens borrow the shared
//! [`GuideSession`] for the duration of a key press or a draw.

mod search;
mod steps;
mod summary;

use std::fmt;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use stepguide_core::GuideSession;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Search,
    Steps,
    Summary,
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "Search"),
            Self::Steps => write!(f, "Steps"),
            Self::Summary => write!(f, "Summary"),
        }
    }
}

/// What a screen asks the app to do after handling a key.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScreenAction {
    None,
    Goto(ScreenId),
    Status(String),
}

/// State for every screen.
pub(crate) struct Screens {
    pub search: search::SearchScreen,
    pub steps: steps::StepsScreen,
    pub summary: summary::SummaryScreen,
}

impl Screens {
    pub(crate) fn new(typing_indicator: bool) -> Self {
        Self {
            search: search::SearchScreen::new(),
            steps: steps::StepsScreen::new(typing_indicator),
            summary: summary::SummaryScreen::new(),
        }
    }

    /// Whether the screen has an active text input field.
    pub(crate) fn is_editing(&self, id: ScreenId) -> bool {
        match id {
            ScreenId::Search => self.search.is_editing(),
            ScreenId::Steps => self.steps.is_editing(),
            ScreenId::Summary => false,
        }
    }

    pub(crate) fn draw(&self, id: ScreenId, session: &GuideSession, f: &mut Frame, area: Rect) {
        match id {
            ScreenId::Search => self.search.draw(session, f, area),
            ScreenId::Steps => self.steps.draw(session, f, area),
            ScreenId::Summary => self.summary.draw(session, f, area),
        }
    }

    pub(crate) fn handle_key(
        &mut self,
        id: ScreenId,
        session: &mut GuideSession,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> ScreenAction {
        let action = match id {
            ScreenId::Search => self.search.handle_key(session, code, modifiers),
            ScreenId::Steps => self.steps.handle_key(session, code, modifiers),
            ScreenId::Summary => self.summary.handle_key(code, modifiers),
        };
        // A fresh article or a restart invalidates per-article screen state
        if action == ScreenAction::Goto(ScreenId::Steps) && id == ScreenId::Search {
            self.steps.article_started(session);
        }
        if action == ScreenAction::Goto(ScreenId::Search) && id == ScreenId::Steps {
            self.search.clear();
        }
        action
    }
}
