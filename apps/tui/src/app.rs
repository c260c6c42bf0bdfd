//! Core TUI application state and event loop.

use std::io;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use stepguide_core::GuideSession;
use stepguide_retrieval::HtmlPageScanner;
use stepguide_shared::{AppConfig, load_config};
use tracing::{info, warn};

use crate::screens::{ScreenAction, ScreenId, Screens};
use crate::widgets::status_bar;

/// Application state.
pub(crate) struct App {
    /// The troubleshooting session every screen works against.
    pub session: GuideSession,
    /// Currently active screen tab.
    pub active_tab: usize,
    /// Available screens.
    pub tabs: Vec<ScreenId>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether help overlay is visible.
    pub show_help: bool,
    pub screens: Screens,
}

impl App {
    pub(crate) fn new(session: GuideSession, config: &AppConfig, seed: Option<String>) -> Self {
        let mut screens = Screens::new(config.features.typing_indicator);
        if let Some(query) = seed {
            screens.search.seed(&session, query);
        }

        Self {
            session,
            active_tab: 0,
            tabs: vec![ScreenId::Search, ScreenId::Steps, ScreenId::Summary],
            should_quit: false,
            status: "Ready. Press ? for help".to_string(),
            show_help: false,
            screens,
        }
    }

    fn current(&self) -> ScreenId {
        self.tabs[self.active_tab]
    }

    fn goto(&mut self, id: ScreenId) {
        if let Some(idx) = self.tabs.iter().position(|t| *t == id) {
            self.active_tab = idx;
            self.status = format!("{id}");
        }
    }

    fn apply(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::None => {}
            ScreenAction::Goto(id) => self.goto(id),
            ScreenAction::Status(msg) => self.status = msg,
        }
    }
}

/// Entry point — loads config, sets up terminal, runs event loop, restores terminal.
pub(crate) fn run() -> Result<()> {
    let config = load_config()?;
    let session = GuideSession::from_config(&config)?;
    let seed = page_seed(&config);
    info!(session_id = %session.id(), "tui session started");

    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let mut app = App::new(session, &config, seed);
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// A failed page scan only costs the pre-filled query.
fn page_seed(config: &AppConfig) -> Option<String> {
    let page = config.features.page_path.as_ref()?;
    let scanner = HtmlPageScanner::new(page);
    match GuideSession::seed_query(config.features.page_scan, &scanner) {
        Ok(seed) => seed,
        Err(e) => {
            warn!(error = %e, "page scan failed");
            None
        }
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        // Poll for events with 100ms timeout; the typing indicator relies on redraws
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                handle_key(app, key.code, key.modifiers);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

pub(crate) fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let editing = app.screens.is_editing(app.current());

    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('q') if !editing => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') if !editing => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        // Tab navigation with number keys
        KeyCode::Char(c @ '1'..='3') if !editing => {
            let idx = (c as usize) - ('1' as usize);
            if idx < app.tabs.len() {
                app.active_tab = idx;
                app.status = format!("{}", app.tabs[idx]);
            }
            return;
        }
        KeyCode::Tab if !editing => {
            app.active_tab = (app.active_tab + 1) % app.tabs.len();
            app.status = format!("{}", app.tabs[app.active_tab]);
            return;
        }
        KeyCode::BackTab if !editing => {
            app.active_tab = if app.active_tab == 0 {
                app.tabs.len() - 1
            } else {
                app.active_tab - 1
            };
            app.status = format!("{}", app.tabs[app.active_tab]);
            return;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Delegate to current screen
    let current = app.current();
    let action = app
        .screens
        .handle_key(current, &mut app.session, code, modifiers);
    app.apply(action);
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar
    let tab_titles: Vec<Line> = app
        .tabs
        .iter()
        .map(|s| Line::from(format!("{s}")))
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" StepGuide "))
        .select(app.active_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    // Content area — delegate to screen
    let current = app.current();
    app.screens.draw(current, &app.session, f, chunks[1]);

    // Status bar
    let bar = status_bar(&app.status);
    f.render_widget(bar, chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-3          Switch to screen"),
        Line::from("  Tab/S-Tab    Next/previous screen"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Search:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  /            Edit the problem description"),
        Line::from("  ↑/↓ Enter    Pick an article and start"),
        Line::from(""),
        Line::from("Steps:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter / c    Step done, continue"),
        Line::from("  b            Back one step"),
        Line::from("  f            Report that the step failed"),
        Line::from("  r            Restart with a new search"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help — press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_app() -> App {
        let config = AppConfig::default();
        let session = GuideSession::from_config(&config).expect("session");
        App::new(session, &config, None)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, code, KeyModifiers::NONE);
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn search_then_start_moves_to_steps_tab() {
        let mut app = make_app();
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "printer offline");
        press(&mut app, KeyCode::Enter);
        // Leave the query field, then pick the highlighted result
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.current(), ScreenId::Steps);
        assert_eq!(
            app.session.active_article().map(|a| a.id.as_str()),
            Some("kb-printer-offline")
        );
    }

    #[test]
    fn q_while_editing_is_text_not_quit() {
        let mut app = make_app();
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn number_keys_switch_tabs() {
        let mut app = make_app();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.current(), ScreenId::Summary);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current(), ScreenId::Steps);
    }
}
