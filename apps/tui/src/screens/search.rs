//! "Search" screen — problem description input and ranked article list.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use stepguide_core::GuideSession;
use stepguide_retrieval::SearchOutcome;
use tracing::debug;

use super::{ScreenAction, ScreenId};

/// One ranked result, detached from the session borrow.
struct ResultRow {
    id: String,
    title: String,
    product: String,
    score: u32,
}

pub(crate) struct SearchScreen {
    query: String,
    editing: bool,
    results: Vec<ResultRow>,
    low_confidence: bool,
    selected: usize,
    status: String,
}

impl SearchScreen {
    pub(crate) fn new() -> Self {
        Self {
            query: String::new(),
            editing: false,
            results: Vec::new(),
            low_confidence: false,
            selected: 0,
            status: "Press / to describe the problem.".to_string(),
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    /// Pre-fill the query (from the page scanner) and search right away.
    pub(crate) fn seed(&mut self, session: &GuideSession, query: String) {
        self.query = query;
        self.run_search(session);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    fn run_search(&mut self, session: &GuideSession) {
        let outcome = session.search(&self.query);
        self.low_confidence = outcome.low_confidence();
        self.results = outcome
            .matches()
            .iter()
            .map(|m| ResultRow {
                id: m.article.id.to_string(),
                title: m.article.title.clone(),
                product: m.article.product.clone(),
                score: m.score,
            })
            .collect();
        self.selected = 0;
        self.status = match &outcome {
            SearchOutcome::NoMatch => "No matching articles. Press / to try other words.".to_string(),
            SearchOutcome::Matches(list) if list.low_confidence => {
                "Low confidence: check the article fits before starting.".to_string()
            }
            SearchOutcome::Matches(_) => "Enter to start the highlighted article.".to_string(),
        };
        debug!(query = %self.query, results = self.results.len(), "search screen updated");
    }

    pub(crate) fn draw(&self, _session: &GuideSession, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Query
                Constraint::Min(1),    // Results
                Constraint::Length(3), // Status
            ])
            .split(area);

        let query_style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let query_block = Block::default()
            .borders(Borders::ALL)
            .title(" Problem description ")
            .border_style(query_style);
        f.render_widget(Paragraph::new(self.query.as_str()).block(query_block), chunks[0]);

        let title = if self.low_confidence {
            format!(" Matches ({}) · low confidence ", self.results.len())
        } else {
            format!(" Matches ({}) ", self.results.len())
        };
        let items: Vec<ListItem> = self
            .results
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let style = if i == self.selected {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let prefix = if i == self.selected { "▸ " } else { "  " };
                ListItem::new(format!(
                    "{prefix}{}  [{}]  score {}  ({})",
                    row.title, row.product, row.score, row.id
                ))
                .style(style)
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, chunks[1]);

        let status_style = if self.low_confidence {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let status = Paragraph::new(self.status.as_str())
            .style(status_style)
            .alignment(Alignment::Center);
        f.render_widget(status, chunks[2]);
    }

    pub(crate) fn handle_key(
        &mut self,
        session: &mut GuideSession,
        code: KeyCode,
        _modifiers: KeyModifiers,
    ) -> ScreenAction {
        if self.editing {
            match code {
                KeyCode::Char(c) => self.query.push(c),
                KeyCode::Backspace => {
                    self.query.pop();
                }
                KeyCode::Enter => {
                    self.editing = false;
                    self.run_search(session);
                }
                KeyCode::Esc => self.editing = false,
                _ => {}
            }
            return ScreenAction::None;
        }

        match code {
            KeyCode::Char('/') | KeyCode::Char('e') => {
                self.editing = true;
                self.status = "Type the problem · Enter to search · Esc to stop editing".to_string();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.results.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                let Some(row) = self.results.get(self.selected) else {
                    return ScreenAction::None;
                };
                return match session.start(&row.id) {
                    Ok(_) => ScreenAction::Goto(ScreenId::Steps),
                    Err(e) => ScreenAction::Status(e.to_string()),
                };
            }
            _ => {}
        }
        ScreenAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepguide_shared::AppConfig;

    fn make_session() -> GuideSession {
        GuideSession::from_config(&AppConfig::default()).expect("session")
    }

    #[test]
    fn seed_runs_search_immediately() {
        let session = make_session();
        let mut screen = SearchScreen::new();
        screen.seed(&session, "vpn remote access".into());
        assert_eq!(screen.results[0].id, "kb-vpn-connect");
        assert!(!screen.is_editing());
    }

    #[test]
    fn no_match_leaves_list_empty() {
        let mut session = make_session();
        let mut screen = SearchScreen::new();
        screen.seed(&session, "zzzz qqqq".into());
        assert!(screen.results.is_empty());
        assert_eq!(
            screen.handle_key(&mut session, KeyCode::Enter, KeyModifiers::NONE),
            ScreenAction::None
        );
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut session = make_session();
        let mut screen = SearchScreen::new();
        screen.seed(&session, "email printer teams".into());
        let n = screen.results.len();
        for _ in 0..10 {
            screen.handle_key(&mut session, KeyCode::Down, KeyModifiers::NONE);
        }
        assert_eq!(screen.selected, n - 1);
        for _ in 0..10 {
            screen.handle_key(&mut session, KeyCode::Up, KeyModifiers::NONE);
        }
        assert_eq!(screen.selected, 0);
    }
}
