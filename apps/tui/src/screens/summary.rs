//! "Summary" screen — completion state, attempted paths, and failure history.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use stepguide_core::{CompletionSummary, GuideSession};

use super::ScreenAction;

pub(crate) struct SummaryScreen {
    scroll: u16,
}

impl SummaryScreen {
    pub(crate) fn new() -> Self {
        Self { scroll: 0 }
    }

    pub(crate) fn draw(&self, session: &GuideSession, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Session {} ", session.id()));

        let Some(summary) = session.summary() else {
            let empty = Paragraph::new("Nothing to summarize yet.")
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(empty, area);
            return;
        };

        let body = Paragraph::new(summary_lines(&summary))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(block);
        f.render_widget(body, area);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> ScreenAction {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
        ScreenAction::None
    }
}

fn summary_lines(summary: &CompletionSummary) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let (status, color) = if summary.is_complete {
        ("complete", Color::Green)
    } else {
        ("in progress", Color::Yellow)
    };

    let mut lines = vec![
        Line::from(format!(
            "{} on path {}: {status}",
            summary.article_id, summary.active_path
        ))
        .style(Style::default().fg(color)),
        Line::from(""),
        Line::from(format!("Completed steps ({})", summary.completed_steps.len())).style(bold),
    ];
    lines.extend(
        summary
            .completed_steps
            .iter()
            .map(|step| Line::from(format!("  ✓ {step}"))),
    );

    lines.push(Line::from(""));
    lines.push(Line::from("Paths tried").style(bold));
    lines.extend(summary.attempted_paths.iter().map(|a| {
        Line::from(format!(
            "  {} / {}  at {}",
            a.article_id,
            a.path,
            a.started_at.format("%H:%M:%S")
        ))
    }));

    if !summary.failure_history.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Failures").style(bold));
        lines.extend(summary.failure_history.iter().map(|r| {
            let note = r.note.as_deref().unwrap_or("-");
            Line::from(format!(
                "  ✗ {}/{} · {} · {note}",
                r.article_id,
                r.step_id,
                r.reason.label()
            ))
                .style(Style::default().fg(Color::Red))
        }));
    }
    lines
}
