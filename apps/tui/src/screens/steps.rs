//! "Steps" screen — the current step, navigation, and the failure form.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use stepguide_core::{FallbackDecision, FallbackTarget, GuideSession};
use stepguide_shared::{FailureReason, NavigationError, StepGuideError};
use tracing::{debug, warn};

use super::{ScreenAction, ScreenId};
use crate::app::centered_rect;

const TYPING_DELAY: Duration = Duration::from_millis(400);
const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

/// Reason picker plus free-text note.
struct FailureForm {
    reason_idx: usize,
    note: String,
    editing_note: bool,
}

/// The decision returned by the last failure report, waiting for the agent.
struct PendingFallback {
    message: String,
    target: Option<FallbackTarget>,
}

pub(crate) struct StepsScreen {
    typing_indicator: bool,
    typing_until: Option<Instant>,
    /// One-shot "skipped N steps" notice.
    banner: Option<String>,
    form: Option<FailureForm>,
    pending: Option<PendingFallback>,
}

impl StepsScreen {
    pub(crate) fn new(typing_indicator: bool) -> Self {
        Self {
            typing_indicator,
            typing_until: None,
            banner: None,
            form: None,
            pending: None,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.form.as_ref().is_some_and(|f| f.editing_note)
    }

    pub(crate) fn article_started(&mut self, _session: &GuideSession) {
        self.banner = None;
        self.form = None;
        self.pending = None;
        self.start_typing();
    }

    fn start_typing(&mut self) {
        if self.typing_indicator {
            self.typing_until = Some(Instant::now() + TYPING_DELAY);
        }
    }

    fn is_typing(&self) -> bool {
        self.typing_until.is_some_and(|t| Instant::now() < t)
    }

    // -- drawing --------------------------------------------------------------

    pub(crate) fn draw(&self, session: &GuideSession, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Article header
                Constraint::Min(1),    // Step body
                Constraint::Length(1), // Banner
                Constraint::Length(1), // Key hints
            ])
            .split(area);

        let Some(article) = session.active_article() else {
            let empty = Paragraph::new("No article in progress.\n\nPick one on the Search tab.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" Steps "));
            f.render_widget(empty, chunks[1]);
            return;
        };

        let header = Paragraph::new(format!("{}  ({})", article.title, article.id)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Article ")
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(header, chunks[0]);

        let body = match session.current_step() {
            Some(_) if self.is_typing() => {
                let frame = self
                    .typing_until
                    .map(|t| t.saturating_duration_since(Instant::now()).as_millis() / 100)
                    .unwrap_or(0) as usize;
                vec![Line::from(format!("{} typing...", SPINNER[frame % SPINNER.len()]))
                    .style(Style::default().fg(Color::DarkGray))]
            }
            Some(step) => {
                let mut lines = Vec::new();
                if step.is_first && step.path.is_main() && !article.prechecks.is_empty() {
                    lines.push(
                        Line::from("Before you start:")
                            .style(Style::default().add_modifier(Modifier::BOLD)),
                    );
                    for check in &article.prechecks {
                        lines.push(Line::from(format!("  - {check}")));
                    }
                    lines.push(Line::from(""));
                }
                let path = if step.path.is_main() {
                    String::new()
                } else {
                    format!("  · fallback {}", step.path)
                };
                lines.push(
                    Line::from(format!("Step {} of {}{path}", step.step_number, step.total_steps))
                        .style(Style::default().fg(Color::Cyan)),
                );
                lines.push(Line::from(step.text.clone()));
                if let Some(expected) = &step.expected_result {
                    lines.push(Line::from(""));
                    lines.push(Line::from(format!("Expect: {expected}")));
                }
                if let Some(say) = &step.say_to_customer {
                    lines.push(Line::from(format!("Say: \"{say}\"")).style(Style::default().fg(Color::Green)));
                }
                lines
            }
            None => vec![
                Line::from("All steps on this path are done.")
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                Line::from(""),
                Line::from("Press 3 for the summary, f if the problem persists, r to start over."),
            ],
        };
        let body = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" Current step "));
        f.render_widget(body, chunks[1]);

        if let Some(banner) = &self.banner {
            let banner = Paragraph::new(banner.as_str())
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(banner, chunks[2]);
        }

        let hints = Paragraph::new("Enter/c continue · b back · f failed · r restart")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hints, chunks[3]);

        if let Some(form) = &self.form {
            draw_failure_form(f, form);
        } else if let Some(pending) = &self.pending {
            draw_pending(f, pending);
        }
    }

    // -- input ----------------------------------------------------------------

    pub(crate) fn handle_key(
        &mut self,
        session: &mut GuideSession,
        code: KeyCode,
        _modifiers: KeyModifiers,
    ) -> ScreenAction {
        if self.form.is_some() {
            return self.handle_form_key(session, code);
        }
        if self.pending.is_some() {
            return self.handle_pending_key(session, code);
        }
        if session.active_article().is_none() {
            return ScreenAction::None;
        }

        match code {
            KeyCode::Enter | KeyCode::Char('c') => {
                self.banner = None;
                let Some(step) = session.current_step() else {
                    return ScreenAction::None;
                };
                match session.continue_step(Some(&step.step_ref())) {
                    Ok(outcome) if outcome.completed => {
                        ScreenAction::Status("Path complete.".to_string())
                    }
                    Ok(outcome) => {
                        if outcome.advanced {
                            self.start_typing();
                        }
                        ScreenAction::None
                    }
                    Err(e) => ScreenAction::Status(e.to_string()),
                }
            }
            KeyCode::Char('b') => {
                self.banner = None;
                match session.back() {
                    Ok(_) => ScreenAction::None,
                    Err(StepGuideError::Navigation(NavigationError::AlreadyAtFirstStep)) => {
                        ScreenAction::Status("Already at the first step.".to_string())
                    }
                    Err(e) => ScreenAction::Status(e.to_string()),
                }
            }
            KeyCode::Char('f') => {
                self.form = Some(FailureForm {
                    reason_idx: 0,
                    note: String::new(),
                    editing_note: false,
                });
                ScreenAction::None
            }
            KeyCode::Char('r') => {
                session.reset();
                *self = Self::new(self.typing_indicator);
                ScreenAction::Goto(ScreenId::Search)
            }
            _ => ScreenAction::None,
        }
    }

    fn handle_form_key(&mut self, session: &mut GuideSession, code: KeyCode) -> ScreenAction {
        let Some(form) = self.form.as_mut() else {
            return ScreenAction::None;
        };

        if form.editing_note {
            match code {
                KeyCode::Char(c) => form.note.push(c),
                KeyCode::Backspace => {
                    form.note.pop();
                }
                KeyCode::Esc | KeyCode::Tab => form.editing_note = false,
                KeyCode::Enter => return self.submit_failure(session),
                _ => {}
            }
            return ScreenAction::None;
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => form.reason_idx = form.reason_idx.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if form.reason_idx + 1 < FailureReason::ALL.len() {
                    form.reason_idx += 1;
                }
            }
            KeyCode::Tab | KeyCode::Char('n') => form.editing_note = true,
            KeyCode::Enter => return self.submit_failure(session),
            KeyCode::Esc => self.form = None,
            _ => {}
        }
        ScreenAction::None
    }

    fn submit_failure(&mut self, session: &mut GuideSession) -> ScreenAction {
        let Some(form) = self.form.take() else {
            return ScreenAction::None;
        };
        let reason = FailureReason::ALL[form.reason_idx];

        let pending = match session.report_failure(reason, Some(&form.note)) {
            Ok(decision) => {
                let message = match &decision {
                    FallbackDecision::SameArticle { fallback, .. } => {
                        format!("Fallback available: {}", fallback.condition)
                    }
                    FallbackDecision::CrossArticle { article, fallback } => format!(
                        "Related article \"{}\" has a fallback: {}",
                        article.title, fallback.condition
                    ),
                    FallbackDecision::Escalation { escalation: Some(esc) } => {
                        format!("Escalate to {} ({})", esc.target, esc.when)
                    }
                    FallbackDecision::Escalation { escalation: None } => {
                        "No fallback left. Escalate to support.".to_string()
                    }
                };
                debug!(kind = decision.kind(), "failure decision shown");
                PendingFallback {
                    message,
                    target: decision.target(),
                }
            }
            Err(e) => {
                warn!(error = %e, "failure report rejected");
                return ScreenAction::Status(e.to_string());
            }
        };
        self.pending = Some(pending);
        ScreenAction::None
    }

    fn handle_pending_key(&mut self, session: &mut GuideSession, code: KeyCode) -> ScreenAction {
        let Some(pending) = self.pending.as_ref() else {
            return ScreenAction::None;
        };

        let Some(target) = pending.target.clone() else {
            if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                self.pending = None;
            }
            return ScreenAction::None;
        };

        match code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.pending = None;
                match session.switch_to_fallback(&target) {
                    Ok(outcome) => {
                        self.banner = session
                            .take_skipped_notice()
                            .map(|n| format!("Skipped {n} step(s) already done."));
                        self.start_typing();
                        if outcome.completed {
                            ScreenAction::Status("Every fallback step was already done.".to_string())
                        } else {
                            ScreenAction::Status(format!("Switched to fallback {}", target.fallback_id))
                        }
                    }
                    Err(e) => ScreenAction::Status(e.to_string()),
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.pending = None;
                ScreenAction::None
            }
            _ => ScreenAction::None,
        }
    }
}

fn draw_failure_form(f: &mut Frame, form: &FailureForm) {
    let area = centered_rect(60, 60, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = FailureReason::ALL
        .iter()
        .enumerate()
        .map(|(i, reason)| {
            let selected = i == form.reason_idx;
            let prefix = if selected { "▸ " } else { "  " };
            let style = if selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{prefix}{}", reason.label())).style(style)
        })
        .collect();
    let reasons = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" What happened? ↑/↓ · Tab note · Enter submit · Esc cancel "),
    );

    let note_style = if form.editing_note {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let note = Paragraph::new(form.note.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Note (optional) ")
            .border_style(note_style),
    );

    f.render_widget(Clear, area);
    f.render_widget(reasons, chunks[0]);
    f.render_widget(note, chunks[1]);
}

fn draw_pending(f: &mut Frame, pending: &PendingFallback) {
    let area = centered_rect(60, 30, f.area());
    let prompt = if pending.target.is_some() {
        "y/Enter switch · n/Esc stay"
    } else {
        "Enter/Esc close"
    };
    let text = vec![
        Line::from(pending.message.clone()),
        Line::from(""),
        Line::from(prompt).style(Style::default().fg(Color::DarkGray)),
    ];
    let popup = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Next step "));
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepguide_shared::AppConfig;

    fn started(article_id: &str) -> (GuideSession, StepsScreen) {
        let mut session = GuideSession::from_config(&AppConfig::default()).expect("session");
        session.start(article_id).expect("start");
        let mut screen = StepsScreen::new(false);
        screen.article_started(&session);
        (session, screen)
    }

    fn press(screen: &mut StepsScreen, session: &mut GuideSession, code: KeyCode) -> ScreenAction {
        screen.handle_key(session, code, KeyModifiers::NONE)
    }

    #[test]
    fn continue_and_back_move_the_runner() {
        let (mut session, mut screen) = started("kb-printer-offline");
        press(&mut screen, &mut session, KeyCode::Enter);
        assert_eq!(session.current_step().expect("step").step_id, "print-2");

        press(&mut screen, &mut session, KeyCode::Char('b'));
        assert_eq!(session.current_step().expect("step").step_id, "print-1");

        let action = press(&mut screen, &mut session, KeyCode::Char('b'));
        assert_eq!(action, ScreenAction::Status("Already at the first step.".into()));
    }

    #[test]
    fn failure_form_leads_to_same_article_fallback_with_banner() {
        let (mut session, mut screen) = started("kb-email-not-sending");
        press(&mut screen, &mut session, KeyCode::Enter);
        press(&mut screen, &mut session, KeyCode::Enter);

        press(&mut screen, &mut session, KeyCode::Char('f'));
        press(&mut screen, &mut session, KeyCode::Tab);
        assert!(screen.is_editing());
        for c in "still stuck".chars() {
            press(&mut screen, &mut session, KeyCode::Char(c));
        }
        press(&mut screen, &mut session, KeyCode::Enter);
        assert!(screen.form.is_none());
        let pending = screen.pending.as_ref().expect("pending decision");
        assert_eq!(
            pending.target.as_ref().map(|t| t.fallback_id.as_str()),
            Some("fb-webmail")
        );

        press(&mut screen, &mut session, KeyCode::Char('y'));
        assert_eq!(screen.banner.as_deref(), Some("Skipped 1 step(s) already done."));
        assert_eq!(session.current_step().expect("step").step_id, "email-fb-2");

        // Banner shows once
        press(&mut screen, &mut session, KeyCode::Enter);
        assert!(screen.banner.is_none());
    }

    #[test]
    fn escalation_popup_closes_without_switching() {
        let (mut session, mut screen) = started("kb-teams-audio");
        press(&mut screen, &mut session, KeyCode::Char('f'));
        press(&mut screen, &mut session, KeyCode::Enter);

        let pending = screen.pending.as_ref().expect("pending");
        assert!(pending.target.is_none());
        press(&mut screen, &mut session, KeyCode::Char('y'));
        assert!(screen.pending.is_some());
        press(&mut screen, &mut session, KeyCode::Esc);
        assert!(screen.pending.is_none());
        assert_eq!(
            session.active_article().map(|a| a.id.as_str()),
            Some("kb-teams-audio")
        );
    }

    #[test]
    fn restart_resets_session_and_returns_to_search() {
        let (mut session, mut screen) = started("kb-vpn-connect");
        let action = press(&mut screen, &mut session, KeyCode::Char('r'));
        assert_eq!(action, ScreenAction::Goto(ScreenId::Search));
        assert!(session.active_article().is_none());
    }
}
